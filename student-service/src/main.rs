use service_core::observability::init_tracing;
use student_service::config::StudentConfig;
use student_service::services::init_metrics;
use student_service::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StudentConfig::load()?;

    init_tracing(
        "student-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )?;

    // Must run before any metric is recorded
    init_metrics()?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start student-service: {}", e);
        e
    })?;
    application.run_until_stopped().await?;

    Ok(())
}
