//! Mock JWKS endpoint backed by wiremock.
//!
//! Serves a JWKS document at `/.well-known/jwks.json`, the same path an
//! Auth0 tenant uses, and counts how often it was fetched.

use crate::crypto_fixtures::{jwks_json, TestKeypair};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running mock JWKS server.
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a server publishing `keypairs`.
    pub async fn start(keypairs: &[&TestKeypair]) -> Self {
        Self::serving(jwks_json(keypairs)).await
    }

    /// Start a server returning `jwks` verbatim.
    pub async fn serving(jwks: Value) -> Self {
        let server = MockServer::start().await;
        let this = Self { server };
        this.mount(ResponseTemplate::new(200).set_body_json(jwks))
            .await;
        this
    }

    /// Start a server that answers every fetch with `status`.
    pub async fn failing(status: u16) -> Self {
        let server = MockServer::start().await;
        let this = Self { server };
        this.mount(ResponseTemplate::new(status)).await;
        this
    }

    /// Base URI, e.g. `http://127.0.0.1:41234`.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Full JWKS URL to hand to the service under test.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Publish a different key set. Also resets the fetch count.
    pub async fn rotate(&self, keypairs: &[&TestKeypair]) {
        self.server.reset().await;
        self.mount(ResponseTemplate::new(200).set_body_json(jwks_json(keypairs)))
            .await;
    }

    /// Make every subsequent fetch fail. Also resets the fetch count.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        self.mount(ResponseTemplate::new(status)).await;
    }

    /// Serve `keypairs`, but only after `delay`. Also resets the fetch count.
    pub async fn respond_slowly(&self, keypairs: &[&TestKeypair], delay: Duration) {
        self.server.reset().await;
        self.mount(
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keypairs))
                .set_delay(delay),
        )
        .await;
    }

    /// Number of JWKS requests received since start or the last reset.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    async fn mount(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
