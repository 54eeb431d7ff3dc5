//! Casting Agency
//!
//! Entry point for the movie and actor catalog service.

use casting_agency::auth::{AuthGuard, HttpKeySource, JwksClient, JwtValidator, KeySource};
use casting_agency::config::Config;
use casting_agency::observability::metrics::init_metrics_recorder;
use casting_agency::repositories::CatalogStore;
use casting_agency::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casting_agency=debug,ca=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Casting Agency");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        issuer = %config.issuer(),
        audience = %config.api_audience,
        algorithms = ?config.jwt_algorithms,
        jwks_url = %config.jwks_url,
        require_iss_exp = config.jwt_require_iss_exp,
        "Configuration loaded successfully"
    );

    if !config.jwt_require_iss_exp {
        warn!("Tokens without iss or exp claims will skip those checks (JWT_REQUIRE_ISS_EXP=false)");
    }

    // Metrics recorder must exist before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Auth: key source -> JWKS cache -> validator -> guard
    let key_source: Arc<dyn KeySource> = Arc::new(HttpKeySource::new(
        config.jwks_url.clone(),
        config.jwks_fetch_timeout(),
    ));
    let jwks_client = Arc::new(JwksClient::with_ttl(key_source, config.jwks_cache_ttl()));
    let jwt_validator = Arc::new(JwtValidator::new(
        Arc::clone(&jwks_client),
        config.verifier_settings(),
    ));
    let guard = Arc::new(AuthGuard::new(jwt_validator));

    // Warm the key cache; failure is not fatal, requests will retry the fetch.
    match jwks_client.get_signing_keys().await {
        Ok(keys) => info!(key_count = keys.len(), "Signing keys loaded"),
        Err(e) => warn!(error = %e, "Signing keys not available at startup"),
    }

    // Create application state
    let state = Arc::new(AppState {
        store: Arc::new(CatalogStore::new()),
        guard,
    });

    // Build application routes
    let app = routes::build_routes(state, metrics_handle);

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Casting Agency listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Casting Agency shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Optional drain period for load balancers to stop routing here
    let drain_secs: u64 = std::env::var("CA_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}
