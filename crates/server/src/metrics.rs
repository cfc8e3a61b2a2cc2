//! Prometheus metrics exposition for `/metrics` (ambient observability, not
//! part of the client wire protocol).

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    let _ = HANDLE.set(handle.clone());
    handle
}

/// Renders the current Prometheus text exposition for the `/metrics` route.
/// Empty until `init_metrics` has run once at startup.
pub fn render() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

pub fn record_session_created() {
    metrics::counter!("relay_sessions_created_total").increment(1);
}

pub fn record_listener_joined() {
    metrics::counter!("relay_listeners_joined_total").increment(1);
}

pub fn record_transcript_processed(success: bool, duration_ms: u64) {
    metrics::counter!("relay_transcripts_processed_total", "success" => success.to_string())
        .increment(1);
    metrics::histogram!("relay_transcript_processing_duration_ms").record(duration_ms as f64);
}

pub fn record_sweep(summary: &relay_pipeline::SweepSummary) {
    metrics::gauge!("relay_sweep_checked").set(summary.checked as f64);
    metrics::gauge!("relay_sweep_closed").set(summary.closed as f64);
}
