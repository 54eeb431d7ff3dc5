//! Liveness and greeting handlers.

use crate::models::HealthResponse;
use axum::Json;
use tracing::instrument;

/// Handler for GET /
#[instrument(skip_all, name = "ca.handlers.greeting")]
pub async fn greeting() -> &'static str {
    "Casting Agency."
}

/// Health check handler.
///
/// Liveness only: the process is up and serving. Does not contact the
/// token issuer, so an issuer outage does not take the service out of
/// rotation.
///
/// ## Example Response
///
/// ```json
/// { "status": "healthy" }
/// ```
#[instrument(skip_all, name = "ca.handlers.health")]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
