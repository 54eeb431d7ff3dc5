//! HTTP routes for Casting Agency.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthGuard;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, PermissionGate};
use crate::repositories::CatalogStore;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Movie and actor records.
    pub store: Arc<CatalogStore>,

    /// Authorization guard shared by every permission gate.
    pub guard: Arc<AuthGuard>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Greeting - public
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/movies`, `/movies/:id` - Movie CRUD, one permission per method
/// - `/actors`, `/actors/:id` - Actor CRUD, one permission per method
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let guard = Arc::clone(&state.guard);
    let gate = move |permission: &str| {
        middleware::from_fn_with_state(
            PermissionGate::new(Arc::clone(&guard), permission),
            require_permission,
        )
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::greeting))
        .route("/health", get(handlers::health_check));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes. Each method carries its own gate, applied as a
    // route layer so it runs before any extractor reads the body.
    let catalog_routes = Router::new()
        .route(
            "/movies",
            get(handlers::list_movies).route_layer(gate("get:movies")),
        )
        .route(
            "/movies",
            post(handlers::create_movie).route_layer(gate("post:movies")),
        )
        .route(
            "/movies/:id",
            patch(handlers::update_movie).route_layer(gate("patch:movies")),
        )
        .route(
            "/movies/:id",
            delete(handlers::delete_movie).route_layer(gate("delete:movies")),
        )
        .route(
            "/actors",
            get(handlers::list_actors).route_layer(gate("get:actors")),
        )
        .route(
            "/actors",
            post(handlers::create_actor).route_layer(gate("post:actors")),
        )
        .route(
            "/actors/:id",
            patch(handlers::update_actor).route_layer(gate("patch:actors")),
        )
        .route(
            "/actors/:id",
            delete(handlers::delete_actor).route_layer(gate("delete:actors")),
        )
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(catalog_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
