//! JWT verification for Casting Agency.
//!
//! Verifies incoming access tokens against the issuer's published signing
//! keys and validates the audience, issuer and expiry claims.
//!
//! # Check order
//!
//! 1. Header: size limit, structure, `kid` present
//! 2. Key lookup by `kid` (one JWKS refresh on miss)
//! 3. Signature, with the header `alg` restricted to the configured
//!    asymmetric allow-list and matched against the key type
//! 4. `aud` equals (or, for array audiences, contains) the API audience
//! 5. `iss` equals the expected issuer, when present
//! 6. `exp` is in the future, when present
//!
//! Checks short-circuit on the first failure; no payload escapes unless all
//! of them pass.
//!
//! # Security
//!
//! Steps 5 and 6 are skipped for tokens that omit `iss` / `exp`. That keeps
//! compatibility with the previous deployment but lets such tokens bypass
//! the checks. `VerifierSettings::require_iss_exp` turns the bypass off.

use crate::auth::claims::ClaimPayload;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::AuthError;
use crate::observability::metrics;
use common::jwt::{decode_ed25519_public_key_jwk, decode_unverified_header, JwtHeaderError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// What a token must satisfy beyond a valid signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Required `aud` value (the API identifier).
    pub audience: String,

    /// Expected `iss` value, compared byte-for-byte (scheme and trailing
    /// slash included).
    pub issuer: String,

    /// Accepted signing algorithms. Asymmetric only.
    pub algorithms: Vec<Algorithm>,

    /// Fail closed when `iss` or `exp` is absent.
    pub require_iss_exp: bool,
}

/// Whether `alg` is a public-key algorithm we can verify with a JWK.
pub fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// JWT validator using JWKS from the issuer.
pub struct JwtValidator {
    /// JWKS client for fetching public keys.
    jwks_client: Arc<JwksClient>,

    /// Audience / issuer / algorithm policy.
    settings: VerifierSettings,
}

impl JwtValidator {
    /// Create a new JWT validator.
    pub fn new(jwks_client: Arc<JwksClient>, settings: VerifierSettings) -> Self {
        Self {
            jwks_client,
            settings,
        }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first failing check; see the module docs
    /// for the order.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<ClaimPayload, AuthError> {
        let start = Instant::now();
        let result = self.verify_inner(token).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "ca.auth.jwt", "Token validated successfully");
                metrics::record_token_validation("success", None, start.elapsed());
            }
            Err(e) => {
                tracing::debug!(target: "ca.auth.jwt", code = e.code(), "Token rejected");
                metrics::record_token_validation("error", Some(e.code()), start.elapsed());
            }
        }

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<ClaimPayload, AuthError> {
        // 1. Header (includes size check via common::jwt)
        let header = decode_unverified_header(token).map_err(|e| {
            tracing::debug!(target: "ca.auth.jwt", error = ?e, "Token header rejected");
            match e {
                JwtHeaderError::TokenTooLarge | JwtHeaderError::MalformedToken => {
                    AuthError::MalformedToken
                }
            }
        })?;
        let kid = header.kid.ok_or_else(|| {
            tracing::debug!(target: "ca.auth.jwt", "Token header has no kid");
            AuthError::MissingKeyId
        })?;

        // 2. Key lookup
        let jwk = self.jwks_client.get_key(&kid).await?;

        // 3. Signature
        let algorithm = resolve_algorithm(header.alg.as_deref(), &self.settings.algorithms)?;
        let claims = verify_signature(token, &jwk, algorithm)?;

        // 4-6. Claims
        validate_claims(&claims, &self.settings, chrono::Utc::now().timestamp())?;

        Ok(claims)
    }
}

/// Map the header `alg` onto the allow-list.
fn resolve_algorithm(alg: Option<&str>, allowed: &[Algorithm]) -> Result<Algorithm, AuthError> {
    // `none` and unknown names fail to parse.
    let algorithm = alg
        .and_then(|name| Algorithm::from_str(name).ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ca.auth.jwt", alg = ?alg, "Unsupported token algorithm");
            AuthError::InvalidSignature
        })?;

    if !is_asymmetric(algorithm) || !allowed.contains(&algorithm) {
        tracing::warn!(target: "ca.auth.jwt", alg = ?algorithm, "Token algorithm not in allow-list");
        return Err(AuthError::InvalidSignature);
    }

    Ok(algorithm)
}

/// Build a decoding key from a JWK for the given algorithm.
fn decoding_key_for(jwk: &Jwk, algorithm: Algorithm) -> Result<DecodingKey, AuthError> {
    if let Some(key_alg) = &jwk.alg {
        if Algorithm::from_str(key_alg).ok() != Some(algorithm) {
            tracing::warn!(target: "ca.auth.jwt", kid = ?jwk.kid, key_alg = %key_alg, "JWK algorithm does not match token");
            return Err(AuthError::InvalidSignature);
        }
    }

    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => match (jwk.kty.as_str(), &jwk.n, &jwk.e) {
            ("RSA", Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e).ok(),
            _ => None,
        },
        Algorithm::ES256 | Algorithm::ES384 => {
            let curve = if algorithm == Algorithm::ES256 {
                "P-256"
            } else {
                "P-384"
            };
            match (jwk.kty.as_str(), jwk.crv.as_deref(), &jwk.x, &jwk.y) {
                ("EC", Some(crv), Some(x), Some(y)) if crv == curve => {
                    DecodingKey::from_ec_components(x, y).ok()
                }
                _ => None,
            }
        }
        Algorithm::EdDSA => match (jwk.kty.as_str(), jwk.crv.as_deref(), &jwk.x) {
            ("OKP", None | Some("Ed25519"), Some(x)) => decode_ed25519_public_key_jwk(x)
                .map_err(|e| {
                    tracing::warn!(target: "ca.auth.jwt", error = %e, "Invalid Ed25519 public key");
                })
                .ok()
                .map(|bytes| DecodingKey::from_ed_der(&bytes)),
            _ => None,
        },
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => None,
    };

    key.ok_or_else(|| {
        tracing::warn!(target: "ca.auth.jwt", kid = ?jwk.kid, kty = %jwk.kty, alg = ?algorithm, "JWK unusable for token algorithm");
        AuthError::InvalidSignature
    })
}

/// Verify the signature and decode the claims. No claim validation happens
/// here; that is `validate_claims`' job so the check order stays fixed.
fn verify_signature(token: &str, jwk: &Jwk, algorithm: Algorithm) -> Result<ClaimPayload, AuthError> {
    let decoding_key = decoding_key_for(jwk, algorithm)?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<ClaimPayload>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "ca.auth.jwt", error = %e, "Token verification failed");
        match e.kind() {
            // Signature already checked out; the body is just not our shape.
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => AuthError::MalformedToken,
            _ => AuthError::InvalidSignature,
        }
    })?;

    Ok(token_data.claims)
}

/// Validate audience, issuer and expiry, in that order.
fn validate_claims(
    claims: &ClaimPayload,
    settings: &VerifierSettings,
    now: i64,
) -> Result<(), AuthError> {
    if !claims
        .aud
        .as_ref()
        .is_some_and(|aud| aud.contains(&settings.audience))
    {
        tracing::debug!(target: "ca.auth.jwt", aud = ?claims.aud, "Token audience mismatch");
        return Err(AuthError::AudienceMismatch);
    }

    match &claims.iss {
        Some(iss) if *iss != settings.issuer => {
            tracing::debug!(target: "ca.auth.jwt", iss = %iss, "Token issuer mismatch");
            return Err(AuthError::IssuerMismatch);
        }
        None if settings.require_iss_exp => {
            tracing::debug!(target: "ca.auth.jwt", "Token has no iss claim");
            return Err(AuthError::IssuerMismatch);
        }
        _ => {}
    }

    match claims.exp {
        Some(exp) if exp <= now => {
            tracing::debug!(target: "ca.auth.jwt", exp = exp, now = now, "Token expired");
            return Err(AuthError::TokenExpired);
        }
        None if settings.require_iss_exp => {
            tracing::debug!(target: "ca.auth.jwt", "Token has no exp claim");
            return Err(AuthError::TokenExpired);
        }
        _ => {}
    }

    Ok(())
}
