use crate::models::Student;
use crate::services::metrics::record_store_operation;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

/// Maps a driver result to `AppError`, counting the outcome per operation.
fn observe<T>(
    operation: &'static str,
    result: Result<T, mongodb::error::Error>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            record_store_operation(operation, "success");
            Ok(value)
        }
        Err(e) => {
            record_store_operation(operation, "error");
            Err(AppError::from(e))
        }
    }
}

#[derive(Clone)]
pub struct StudentDb {
    client: MongoClient,
    db: Database,
}

impl StudentDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for student-service");

        // Unique business key; rejects concurrent creates with the same student_id
        let student_id_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_id_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.students()
            .create_index(student_id_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create student_id index: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on students.student_id");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn students(&self) -> Collection<Student> {
        self.db.collection("students")
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn insert(&self, student: &Student) -> Result<(), AppError> {
        observe("insert", self.students().insert_one(student, None).await)?;
        Ok(())
    }

    pub async fn count(&self, filter: Document) -> Result<u64, AppError> {
        observe("count", self.students().count_documents(filter, None).await)
    }

    /// Natural order; no sort is applied.
    pub async fn list(
        &self,
        filter: Document,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Student>, AppError> {
        let find_options = FindOptions::builder().skip(skip).limit(limit).build();

        let cursor = observe("find", self.students().find(filter, find_options).await)?;
        observe("find", cursor.try_collect().await)
    }

    pub async fn find_by_student_id(&self, student_id: i64) -> Result<Option<Student>, AppError> {
        observe(
            "find_one",
            self.students()
                .find_one(doc! { "student_id": student_id }, None)
                .await,
        )
    }

    /// Applies `changes` with `$set` and returns the post-update document.
    pub async fn update_by_student_id(
        &self,
        student_id: i64,
        changes: Document,
    ) -> Result<Option<Student>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        observe(
            "find_one_and_update",
            self.students()
                .find_one_and_update(
                    doc! { "student_id": student_id },
                    doc! { "$set": changes },
                    options,
                )
                .await,
        )
    }

    /// Removes the record and returns it as it was before deletion.
    pub async fn delete_by_student_id(&self, student_id: i64) -> Result<Option<Student>, AppError> {
        observe(
            "find_one_and_delete",
            self.students()
                .find_one_and_delete(doc! { "student_id": student_id }, None)
                .await,
        )
    }
}
