//! JWKS client for fetching and caching the issuer's public signing keys.
//!
//! Keys are fetched through a [`KeySource`] (production: [`HttpKeySource`],
//! which GETs `https://{issuer_domain}/.well-known/jwks.json`) and cached as
//! an immutable [`SigningKeySet`] snapshot with a configurable TTL.
//!
//! # Refresh policy
//!
//! - A lookup against an empty or expired cache fetches a new key set
//! - A lookup of an unknown `kid` in a live cache fetches once more, to pick
//!   up key rotations before their TTL runs out
//! - Refreshes swap in a whole new `Arc<SigningKeySet>`; readers holding the
//!   previous snapshot are unaffected
//! - Concurrent refreshes are coalesced: a task that waited on another
//!   task's refresh uses that result instead of fetching again
//!
//! Fetch failures surface as `AuthError::KeySetUnavailable`. Nothing here
//! retries.

use crate::errors::AuthError;
use crate::observability::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Longest cache TTL a client will use (24 hours).
pub const MAX_CACHE_TTL_SECONDS: u64 = 86_400;

/// Default timeout for the outbound JWKS request in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// JSON Web Key from the JWKS endpoint.
///
/// Only the members needed to build a verification key are kept; unknown
/// members (`x5c`, `x5t`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type: `RSA`, `EC` or `OKP`.
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm this key is meant for, if the issuer pins one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (`sig` or `enc`).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC / OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document as published by the issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Signing keys indexed by key ID.
///
/// Every key in the set has a unique, non-empty `kid`.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, Jwk>,
}

impl SigningKeySet {
    /// Index a JWKS document by `kid`.
    ///
    /// Keys without a `kid` or marked for encryption are skipped. If two keys
    /// share a `kid` the first one wins.
    pub fn from_jwks(response: JwksResponse) -> Self {
        let mut keys = HashMap::with_capacity(response.keys.len());

        for jwk in response.keys {
            if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
                tracing::debug!(target: "ca.auth.jwks", kid = ?jwk.kid, "Skipping non-signing key");
                continue;
            }

            let Some(kid) = jwk.kid.clone().filter(|k| !k.is_empty()) else {
                tracing::debug!(target: "ca.auth.jwks", kty = %jwk.kty, "Skipping key without kid");
                continue;
            };

            if keys.contains_key(&kid) {
                tracing::warn!(target: "ca.auth.jwks", kid = %kid, "Duplicate kid in JWKS, keeping first");
                continue;
            }

            keys.insert(kid, jwk);
        }

        Self { keys }
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Capability for fetching the issuer's current key set.
///
/// Injected into [`JwksClient`] so the network can be swapped out in tests.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the current JWKS document.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the document cannot be
    /// retrieved or decoded.
    async fn fetch(&self) -> Result<JwksResponse, AuthError>;
}

/// Fetches JWKS over HTTPS with a bounded request timeout.
pub struct HttpKeySource {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Per-request timeout.
    timeout: Duration,
}

impl HttpKeySource {
    /// Create a key source for an explicit JWKS URL.
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "ca.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            timeout,
        }
    }

    /// Create a key source for an issuer's well-known JWKS endpoint.
    pub fn for_issuer_domain(issuer_domain: &str, timeout: Duration) -> Self {
        Self::new(jwks_url_for_domain(issuer_domain), timeout)
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

/// The well-known JWKS URL for an issuer domain.
pub fn jwks_url_for_domain(issuer_domain: &str) -> String {
    format!("https://{issuer_domain}/.well-known/jwks.json")
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<JwksResponse, AuthError> {
        tracing::debug!(target: "ca.auth.jwks", "Fetching JWKS");

        // Per-request timeout applies even if the client fell back to defaults.
        let response = self
            .http_client
            .get(&self.jwks_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "ca.auth.jwks", error = %e, timeout = e.is_timeout(), "Failed to fetch JWKS");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "ca.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "ca.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable
        })
    }
}

/// Cached key set with expiry time.
struct CachedKeySet {
    /// Immutable snapshot handed out to readers.
    keys: Arc<SigningKeySet>,

    /// Monotonic refresh counter, used to coalesce concurrent refreshes.
    generation: u64,

    /// When this cache entry expires.
    expires_at: Instant,
}

/// JWKS client for fetching and caching public keys.
///
/// Thread-safe; share it behind an `Arc`.
pub struct JwksClient {
    /// Where key sets come from.
    source: Arc<dyn KeySource>,

    /// Cached key set snapshot.
    cache: RwLock<Option<CachedKeySet>>,

    /// Serialises refreshes.
    refresh_lock: Mutex<()>,

    /// Last generation handed out.
    generations: AtomicU64,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with the default TTL.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self::with_ttl(source, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a new JWKS client with custom cache TTL.
    ///
    /// TTLs above `MAX_CACHE_TTL_SECONDS` are clamped.
    pub fn with_ttl(source: Arc<dyn KeySource>, cache_ttl: Duration) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generations: AtomicU64::new(0),
            cache_ttl: cache_ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECONDS)),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Get the current signing key set, fetching it if the cache is empty or
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the key set cannot be fetched.
    #[instrument(skip(self))]
    pub async fn get_signing_keys(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        let observed = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.expires_at > Instant::now() => {
                    return Ok(Arc::clone(&cached.keys));
                }
                other => other.map(|cached| cached.generation),
            }
        };

        self.refresh(observed).await
    }

    /// Get a JWK by key ID.
    ///
    /// Returns the cached key if present. Otherwise refreshes the key set
    /// once and tries again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if JWKS cannot be fetched.
    /// Returns `AuthError::UnknownSigningKey` if the key ID is not found
    /// after the refresh.
    #[instrument(skip(self))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let observed = {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "ca.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    tracing::debug!(target: "ca.auth.jwks", kid = %kid, "Key not found in JWKS cache, refreshing");
                }
            }
            cache.as_ref().map(|cached| cached.generation)
        };

        let keys = self.refresh(observed).await?;

        keys.get(kid).cloned().ok_or_else(|| {
            tracing::warn!(target: "ca.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            AuthError::UnknownSigningKey
        })
    }

    /// Fetch a fresh key set regardless of the cache state.
    pub async fn force_refresh(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        let observed = self
            .cache
            .read()
            .await
            .as_ref()
            .map(|cached| cached.generation);
        self.refresh(observed).await
    }

    /// Drop the cached key set. The next lookup fetches.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Refresh the cache unless another task already replaced the snapshot
    /// the caller observed.
    async fn refresh(&self, observed: Option<u64>) -> Result<Arc<SigningKeySet>, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if Some(cached.generation) != observed {
                    tracing::debug!(target: "ca.auth.jwks", "JWKS refreshed by another task");
                    return Ok(Arc::clone(&cached.keys));
                }
            }
        }

        let start = Instant::now();
        let response = match self.source.fetch().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_jwks_refresh("error", start.elapsed());
                return Err(e);
            }
        };
        metrics::record_jwks_refresh("success", start.elapsed());

        let keys = Arc::new(SigningKeySet::from_jwks(response));

        tracing::info!(
            target: "ca.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        // An unrepresentable expiry leaves the entry stale, so the next lookup refetches.
        let now = Instant::now();
        let expires_at = now.checked_add(self.cache_ttl).unwrap_or(now);

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: Arc::clone(&keys),
            generation: self.generations.fetch_add(1, Ordering::SeqCst) + 1,
            expires_at,
        });

        Ok(keys)
    }
}

/// In-memory key source for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Key source that serves a swappable in-memory JWKS and counts fetches.
    pub struct MockKeySource {
        /// JWKS document to serve; `None` simulates an outage.
        jwks: Mutex<Option<serde_json::Value>>,
        /// Number of fetches made.
        fetch_count: AtomicUsize,
    }

    impl MockKeySource {
        /// Serve the given JWKS document (`{"keys": [...]}`).
        pub fn serving(jwks: serde_json::Value) -> Self {
            Self {
                jwks: Mutex::new(Some(jwks)),
                fetch_count: AtomicUsize::new(0),
            }
        }

        /// A source whose every fetch fails.
        pub fn unavailable() -> Self {
            Self {
                jwks: Mutex::new(None),
                fetch_count: AtomicUsize::new(0),
            }
        }

        /// Replace the served document, e.g. to simulate key rotation.
        pub async fn set_jwks(&self, jwks: Option<serde_json::Value>) {
            *self.jwks.lock().await = jwks;
        }

        /// Get the number of fetches made.
        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeySource for MockKeySource {
        async fn fetch(&self) -> Result<JwksResponse, AuthError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);

            let jwks = self.jwks.lock().await.clone();
            let jwks = jwks.ok_or(AuthError::KeySetUnavailable)?;
            serde_json::from_value(jwks).map_err(|_| AuthError::KeySetUnavailable)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockKeySource;
    use super::*;
    use serde_json::json;

    fn rsa_jwk(kid: &str) -> serde_json::Value {
        json!({"kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256", "n": "AQAB", "e": "AQAB"})
    }

    fn client_for(source: &Arc<MockKeySource>) -> JwksClient {
        JwksClient::new(Arc::clone(source) as Arc<dyn KeySource>)
    }

    #[test]
    fn test_jwk_deserialization_rsa() {
        let json = r#"{
            "alg": "RS256",
            "kty": "RSA",
            "use": "sig",
            "n": "mAzKPCWd2NAS_n4y",
            "e": "AQAB",
            "kid": "kid-1",
            "x5t": "ignored",
            "x5c": ["ignored"]
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("kid-1"));
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.n.as_deref(), Some("mAzKPCWd2NAS_n4y"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.x.is_none());
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty": "OKP"}"#).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert!(jwk.kid.is_none());
        assert!(jwk.alg.is_none());
        assert!(jwk.key_use.is_none());
    }

    #[test]
    fn test_signing_key_set_indexes_by_kid() {
        let response: JwksResponse =
            serde_json::from_value(json!({"keys": [rsa_jwk("kid-1"), rsa_jwk("kid-2")]})).unwrap();

        let set = SigningKeySet::from_jwks(response);

        assert_eq!(set.len(), 2);
        assert!(set.get("kid-1").is_some());
        assert!(set.get("kid-2").is_some());
        assert!(set.get("kid-3").is_none());
    }

    #[test]
    fn test_signing_key_set_skips_unusable_keys() {
        let response: JwksResponse = serde_json::from_value(json!({"keys": [
            {"kty": "RSA", "n": "AQAB", "e": "AQAB"},
            {"kty": "RSA", "kid": "", "n": "AQAB", "e": "AQAB"},
            {"kty": "RSA", "kid": "enc-key", "use": "enc", "n": "AQAB", "e": "AQAB"},
            rsa_jwk("kid-1"),
        ]}))
        .unwrap();

        let set = SigningKeySet::from_jwks(response);

        assert_eq!(set.len(), 1);
        assert!(set.get("kid-1").is_some());
        assert!(set.get("enc-key").is_none());
    }

    #[test]
    fn test_signing_key_set_duplicate_kid_keeps_first() {
        let mut second = rsa_jwk("kid-1");
        second["n"] = json!("c2Vjb25k");
        let response: JwksResponse =
            serde_json::from_value(json!({"keys": [rsa_jwk("kid-1"), second]})).unwrap();

        let set = SigningKeySet::from_jwks(response);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("kid-1").unwrap().n.as_deref(), Some("AQAB"));
    }

    #[test]
    fn test_jwks_url_for_domain() {
        assert_eq!(
            jwks_url_for_domain("tenant.us.auth0.com"),
            "https://tenant.us.auth0.com/.well-known/jwks.json"
        );
        let source =
            HttpKeySource::for_issuer_domain("tenant.us.auth0.com", Duration::from_secs(5));
        assert_eq!(
            source.jwks_url(),
            "https://tenant.us.auth0.com/.well-known/jwks.json"
        );
    }

    #[tokio::test]
    async fn test_get_key_fetches_once_then_hits_cache() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = client_for(&source);

        let first = client.get_key("kid-1").await.unwrap();
        let second = client.get_key("kid-1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_triggers_refresh_then_fails() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = client_for(&source);

        client.get_key("kid-1").await.unwrap();
        assert_eq!(source.fetch_count(), 1);

        let result = client.get_key("kid-unknown").await;

        assert_eq!(result, Err(AuthError::UnknownSigningKey));
        assert_eq!(source.fetch_count(), 2, "Unknown kid should force one refresh");
    }

    #[tokio::test]
    async fn test_unknown_kid_picks_up_rotated_key() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = client_for(&source);
        client.get_key("kid-1").await.unwrap();

        source
            .set_jwks(Some(json!({"keys": [rsa_jwk("kid-1"), rsa_jwk("kid-2")]})))
            .await;

        assert!(client.get_key("kid-2").await.is_ok());
        assert!(client.get_key("kid-2").await.is_ok());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_key_set_unavailable() {
        let source = Arc::new(MockKeySource::unavailable());
        let client = client_for(&source);

        assert_eq!(
            client.get_key("kid-1").await,
            Err(AuthError::KeySetUnavailable)
        );
        assert_eq!(
            client.get_signing_keys().await.map(|_| ()),
            Err(AuthError::KeySetUnavailable)
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_no_partial_state() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = client_for(&source);
        client.get_key("kid-1").await.unwrap();

        source.set_jwks(None).await;

        // Refresh for an unknown kid fails; the previous snapshot still serves kid-1.
        assert_eq!(
            client.get_key("kid-2").await,
            Err(AuthError::KeySetUnavailable)
        );
        assert!(client.get_key("kid-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = JwksClient::with_ttl(
            Arc::clone(&source) as Arc<dyn KeySource>,
            Duration::from_millis(10),
        );

        client.get_signing_keys().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        client.get_signing_keys().await.unwrap();

        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_and_force_refresh() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = client_for(&source);

        client.get_signing_keys().await.unwrap();
        client.force_refresh().await.unwrap();
        assert_eq!(source.fetch_count(), 2);

        client.invalidate().await;
        client.get_signing_keys().await.unwrap();
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_fetch_once() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = Arc::new(client_for(&source));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.get_key("kid-1").await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped_and_caches() {
        let source = Arc::new(MockKeySource::serving(json!({"keys": [rsa_jwk("kid-1")]})));
        let client = JwksClient::with_ttl(
            Arc::clone(&source) as Arc<dyn KeySource>,
            Duration::from_secs(u64::MAX),
        );

        assert_eq!(
            client.cache_ttl(),
            Duration::from_secs(MAX_CACHE_TTL_SECONDS)
        );

        client.get_signing_keys().await.unwrap();
        client.get_key("kid-1").await.unwrap();
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn test_jwks_client_custom_ttl() {
        let source = Arc::new(MockKeySource::unavailable());
        let client = JwksClient::with_ttl(source, Duration::from_secs(60));
        assert_eq!(client.cache_ttl(), Duration::from_secs(60));
    }
}
