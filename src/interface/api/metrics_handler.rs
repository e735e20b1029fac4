//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Describe the softphone metrics
pub fn describe_metrics() {
    describe_counter!(
        "softphone_calls_total",
        "Calls offered or placed, labelled by direction"
    );
    describe_counter!(
        "softphone_calls_completed",
        "Calls that connected before ending"
    );
    describe_counter!("softphone_calls_missed", "Inbound calls never answered");
    describe_counter!("softphone_calls_failed", "Outbound calls that never connected");
    describe_gauge!(
        "softphone_session_connected",
        "1 while the vendor session is up"
    );
    describe_gauge!(
        "softphone_active_calls",
        "Calls currently carrying media"
    );
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Recorder-less handle for tests and embedded routers
pub fn detached_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    (StatusCode::OK, prometheus_handle.render()).into_response()
}
