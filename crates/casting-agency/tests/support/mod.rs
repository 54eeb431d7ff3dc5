//! Shared harness for the integration tests: the real router on
//! `127.0.0.1:0`, with the JWKS endpoint mocked by wiremock.

#![allow(dead_code)]

use anyhow::Result;
use ca_test_utils::{MockJwksServer, TestKeypair, TestTokenBuilder};
use casting_agency::auth::{AuthGuard, HttpKeySource, JwksClient, JwtValidator, KeySource};
use casting_agency::config::Config;
use casting_agency::observability::metrics::init_metrics_recorder;
use casting_agency::repositories::CatalogStore;
use casting_agency::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

pub const AUTH0_DOMAIN: &str = "tenant.us.auth0.com";
pub const ISSUER: &str = "https://tenant.us.auth0.com/";
pub const AUDIENCE: &str = "casting_agency";

pub const ALL_PERMISSIONS: [&str; 8] = [
    "get:movies",
    "post:movies",
    "patch:movies",
    "delete:movies",
    "get:actors",
    "post:actors",
    "patch:actors",
    "delete:actors",
];

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test server with a mocked JWKS endpoint.
pub struct TestServer {
    pub addr: SocketAddr,
    pub jwks: MockJwksServer,
    pub keypair: TestKeypair,
    _server_handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(&[]).await
    }

    /// Spawn with extra environment variables layered over the defaults.
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let keypair = TestKeypair::ed25519(1, "test-key-01");
        let jwks = MockJwksServer::start(&[&keypair]).await;

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH0_DOMAIN".to_string(), AUTH0_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), AUDIENCE.to_string()),
            ("JWT_ALGORITHMS".to_string(), "EdDSA,RS256".to_string()),
            ("JWKS_URL".to_string(), jwks.jwks_url()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "1".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_source: Arc<dyn KeySource> = Arc::new(HttpKeySource::new(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout(),
        ));
        let jwks_client = Arc::new(JwksClient::with_ttl(key_source, config.jwks_cache_ttl()));
        let validator = Arc::new(JwtValidator::new(jwks_client, config.verifier_settings()));

        let state = Arc::new(AppState {
            store: Arc::new(CatalogStore::new()),
            guard: Arc::new(AuthGuard::new(validator)),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
        let addr = listener.local_addr()?;

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            jwks,
            keypair,
            _server_handle: server_handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Claims that pass every check; adjust per test.
    pub fn claims(&self) -> TestTokenBuilder {
        TestTokenBuilder::new().issuer(ISSUER).audience(AUDIENCE)
    }

    /// A valid token granting `permissions`.
    pub fn token(&self, permissions: &[&str]) -> String {
        self.keypair.sign(&self.claims().permissions(permissions).build())
    }

    /// A valid token granting every catalog permission.
    pub fn admin_token(&self) -> String {
        self.token(&ALL_PERMISSIONS)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._server_handle.abort();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Read a JSON error body and return its `code` member.
pub async fn error_code(response: reqwest::Response) -> Result<String> {
    let body: serde_json::Value = response.json().await?;
    Ok(body["code"].as_str().unwrap_or_default().to_string())
}
