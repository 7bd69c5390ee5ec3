//! Prometheus metrics
//!
//! Library crates emit through the `metrics` facade; this module installs the
//! Prometheus recorder and serves its exposition text.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` if a recorder is already installed for this process.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus metrics recorder installed");
            Some(handle)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install metrics recorder");
            None
        },
    }
}

/// Count one handled request
pub fn record_request(endpoint: &'static str, status: StatusCode) {
    let class = if status.is_success() {
        "ok"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    };
    metrics::counter!("stylist_requests_total", "endpoint" => endpoint, "status" => class)
        .increment(1);
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(ref handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics disabled\n".to_string(),
        ),
    }
}
