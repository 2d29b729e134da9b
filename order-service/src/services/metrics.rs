use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() -> Result<(), AppError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
    })?;

    // A concurrent caller may have won the race; either handle renders the same recorder.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_order_placed(method: &'static str) {
    counter!("orders_placed_total", "method" => method).increment(1);
}

pub fn record_verification(outcome: &'static str) {
    counter!("payment_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_repair(kind: &'static str, count: u64) {
    counter!("reconciliation_repairs_total", "kind" => kind).increment(count);
}
