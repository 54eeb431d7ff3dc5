//! Builder patterns for test data construction
//!
//! Produces Auth0-style access token claims as JSON, ready for
//! [`crate::TestKeypair::sign`].

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test JWT claims
///
/// Defaults: subject `auth0|test-user`, issued now, expires in one hour, no
/// issuer, audience or permissions. Set those explicitly per test so a
/// missing claim is always deliberate.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .issuer("https://tenant.us.auth0.com/")
///     .audience("casting_agency")
///     .permissions(&["get:movies", "get:actors"])
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("auth0|test-user"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    pub fn issuer(self, iss: &str) -> Self {
        self.claim("iss", json!(iss))
    }

    /// Single-string audience.
    pub fn audience(self, aud: &str) -> Self {
        self.claim("aud", json!(aud))
    }

    /// Array audience, as Auth0 issues when `openid` is requested.
    pub fn audiences(self, auds: &[&str]) -> Self {
        self.claim("aud", json!(auds))
    }

    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    pub fn permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set an arbitrary claim, replacing any previous value.
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely (e.g. `"exp"` or `"iss"`).
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
