//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape metrics.
//! Labels carry no token contents, subjects or record ids.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE ca_token_validations_total counter
/// ca_token_validations_total{status="error",error_type="token_expired"} 3
/// ```
#[tracing::instrument(skip_all, name = "ca.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

// The handle can only be installed once per process; the endpoint is
// covered by tests/health_tests.rs.
