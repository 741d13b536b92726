//! Prometheus metrics for student-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static STORE_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn store_operations_counter() -> prometheus::Result<IntCounterVec> {
    IntCounterVec::new(
        Opts::new(
            "student_operations_total",
            "Total document store operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
}

/// Installs the global recorder and the custom registry. Call once, from the binary.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics already initialized");
    }

    let registry = Registry::new();
    let store_operations = store_operations_counter()?;

    registry.register(Box::new(store_operations.clone()))?;

    PROMETHEUS_REGISTRY
        .set(registry)
        .map_err(|_| anyhow::anyhow!("prometheus registry already set"))?;
    STORE_OPERATIONS_TOTAL
        .set(store_operations)
        .map_err(|_| anyhow::anyhow!("student_operations_total already set"))?;

    Ok(())
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// No-op until [`init_metrics`] has run.
pub fn record_store_operation(operation: &str, outcome: &str) {
    if let Some(counter) = STORE_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}
