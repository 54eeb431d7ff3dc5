//! Casting Agency configuration.
//!
//! Configuration is loaded from environment variables.

use crate::auth::jwks::{
    jwks_url_for_domain, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS,
    MAX_CACHE_TTL_SECONDS,
};
use crate::auth::jwt::{is_asymmetric, VerifierSettings};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Upper bound for `JWKS_FETCH_TIMEOUT_SECONDS`.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Casting Agency configuration.
///
/// Nothing here is secret: the JWKS endpoint and audience are public.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Token issuer host, e.g. `tenant.us.auth0.com` (no scheme).
    pub auth0_domain: String,

    /// Required `aud` claim value.
    pub api_audience: String,

    /// Accepted token signing algorithms (asymmetric only).
    pub jwt_algorithms: Vec<Algorithm>,

    /// JWKS endpoint (default: `https://{auth0_domain}/.well-known/jwks.json`).
    pub jwks_url: String,

    /// How long a fetched key set is trusted.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for one JWKS request.
    pub jwks_fetch_timeout_seconds: u64,

    /// Reject tokens that omit `iss` or `exp`.
    pub jwt_require_iss_exp: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer domain configuration: {0}")]
    InvalidIssuerDomain(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBool(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth0_domain = required(vars, "AUTH0_DOMAIN")?;
        if auth0_domain.contains("://") || auth0_domain.contains('/') {
            return Err(ConfigError::InvalidIssuerDomain(format!(
                "AUTH0_DOMAIN must be a bare host name without scheme or path, got '{}'",
                auth0_domain
            )));
        }

        let api_audience = required(vars, "API_AUDIENCE")?;

        let jwt_algorithms = match vars.get("JWT_ALGORITHMS") {
            Some(value_str) => parse_algorithms(value_str)?,
            None => vec![Algorithm::RS256],
        };

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| jwks_url_for_domain(&auth0_domain));

        // Parse JWKS cache TTL with validation
        let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be between 1 and {}, got {}",
                    MAX_CACHE_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_CACHE_TTL_SECONDS
        };

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_FETCH_TIMEOUT_SECONDS
            };

        let jwt_require_iss_exp = match vars.get("JWT_REQUIRE_ISS_EXP") {
            Some(value_str) => parse_bool("JWT_REQUIRE_ISS_EXP", value_str)?,
            None => false,
        };

        Ok(Config {
            bind_address,
            auth0_domain,
            api_audience,
            jwt_algorithms,
            jwks_url,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            jwt_require_iss_exp,
        })
    }

    /// The `iss` value tokens must carry: `https://{auth0_domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth0_domain)
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }

    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_seconds)
    }

    /// Verification policy derived from this configuration.
    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            audience: self.api_audience.clone(),
            issuer: self.issuer(),
            algorithms: self.jwt_algorithms.clone(),
            require_iss_exp: self.jwt_require_iss_exp,
        }
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_algorithms(value_str: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in value_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let algorithm = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{}'", name))
        })?;

        if !is_asymmetric(algorithm) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "symmetric algorithm '{}' is not allowed",
                name
            )));
        }

        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "JWT_ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}

fn parse_bool(name: &str, value_str: &str) -> Result<bool, ConfigError> {
    match value_str.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool(format!(
            "{} must be true or false, got '{}'",
            name, value_str
        ))),
    }
}
