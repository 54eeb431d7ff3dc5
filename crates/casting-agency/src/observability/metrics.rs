//! Metrics definitions for Casting Agency.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ca_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: route templates only (`/movies/{id}`, never `/movies/7`)
//! - `status`: 3 values (success, error, timeout)
//! - `error_type`: bounded by `AuthError::code`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded; recording without an
/// installed recorder is a no-op.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ca_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Token validation is local crypto unless the key set is cold.
        .set_buckets_for_metric(
            Matcher::Prefix("ca_token_validation".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100, 0.500, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ca_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ca_http_requests_total`, `ca_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Includes framework-level rejections (400 on malformed JSON, 404, 405).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ca_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ca_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto its route template.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" | "/movies" | "/actors" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// `/movies/{id}` and `/actors/{id}`; everything else is `/other`.
fn normalize_dynamic_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');

    if let (Some(resource @ ("movies" | "actors")), Some(id), None) =
        (segments.next(), segments.next(), segments.next())
    {
        if !id.is_empty() {
            return format!("/{resource}/{{id}}");
        }
    }

    "/other".to_string()
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a token verification outcome
///
/// Metric: `ca_token_validations_total`, `ca_token_validation_duration_seconds`
/// Labels: `status`, `error_type`
pub fn record_token_validation(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("ca_token_validation_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ca_token_validations_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch
///
/// Metric: `ca_jwks_refreshes_total`, `ca_jwks_refresh_duration_seconds`
/// Labels: `status`
pub fn record_jwks_refresh(status: &str, duration: Duration) {
    histogram!("ca_jwks_refresh_duration_seconds").record(duration.as_secs_f64());

    counter!("ca_jwks_refreshes_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================
