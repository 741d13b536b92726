#![allow(dead_code)]

use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use student_service::config::{MongoConfig, StudentConfig};
use student_service::Application;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: mongodb::Database,
    pub client: reqwest::Client,
}

pub fn test_config(database: String) -> StudentConfig {
    StudentConfig {
        common: CoreConfig {
            port: 0, // Random port
            ..CoreConfig::default()
        },
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config(format!("student_test_{}", uuid::Uuid::new_v4()));

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().database().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            client,
        }
    }

    pub async fn create_student(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/students", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a student with a fixed dob, asserting the insert succeeded.
    pub async fn seed_student(&self, student_id: i64, name: &str, marks: Option<f64>) {
        let mut body = json!({
            "student_id": student_id,
            "name": name,
            "dob": "2001-04-12",
        });
        if let Some(marks) = marks {
            body["marks"] = json!(marks);
        }

        let response = self.create_student(&body).await;
        assert_eq!(response.status().as_u16(), 201, "seeding {} failed", student_id);
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
