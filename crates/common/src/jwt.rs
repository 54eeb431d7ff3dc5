//! JWT utilities shared across Casting Agency crates.
//!
//! This module provides the parts of JWT handling that do not depend on a
//! particular key source or claims shape:
//! - Size limits for DoS prevention
//! - Unverified header decoding (`kid`, `alg`) for key selection
//! - Public key decoding helpers for JWK members
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned from this module is trusted: the header is only used to
//!   pick a key, and the token MUST still be verified with that key
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified_header, MAX_JWT_SIZE_BYTES};
//!
//! let header = decode_unverified_header(token)?;
//! let kid = header.kid.ok_or(MyError::MissingKeyId)?;
//! let jwk = jwks_client.get_key(&kid).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// # Rationale
///
/// - Typical Auth0 access tokens are 700-1500 bytes (RS256 signature, permissions)
/// - 8KB leaves room for large permission sets while bounding base64/JSON work
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Length in bytes of a raw Ed25519 public key.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting an unverified token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtHeaderError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not three segments, bad base64, bad JSON).
    #[error("Token is not a well-formed JWT")]
    MalformedToken,
}

/// Errors that can occur while decoding JWK key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDecodeError {
    /// The member is not valid base64url.
    #[error("Key material is not valid base64url: {0}")]
    Encoding(String),

    /// The decoded key has the wrong length.
    #[error("Expected {expected} key bytes, got {actual}")]
    Length {
        /// Expected length in bytes.
        expected: usize,
        /// Actual decoded length in bytes.
        actual: usize,
    },
}

// =============================================================================
// Header Types
// =============================================================================

/// The fields of a JOSE header needed to select a verification key.
///
/// Produced WITHOUT signature verification; never trust these values for
/// anything other than key lookup and algorithm negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnverifiedHeader {
    /// Declared signing algorithm (e.g. `RS256`), if any.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key identifier, if present. Empty strings are normalised to `None`.
    #[serde(default, deserialize_with = "non_empty_string")]
    pub kid: Option<String>,
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // A non-string kid (number, object) is treated the same as a missing one.
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_str().map(ToString::to_string))
        .filter(|s| !s.is_empty()))
}

// =============================================================================
// Functions
// =============================================================================

/// Decode the JOSE header of a compact JWT without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three segments, header not base64url, or header not a JSON object
pub fn decode_unverified_header(token: &str) -> Result<UnverifiedHeader, JwtHeaderError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtHeaderError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtHeaderError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtHeaderError::MalformedToken
    })?;

    // Sequences also satisfy a derived `Deserialize`; only an object is a header.
    let object = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(
        &header_bytes,
    )
    .map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "JWT header is not a JSON object");
        JwtHeaderError::MalformedToken
    })?;

    serde_json::from_value::<UnverifiedHeader>(serde_json::Value::Object(object)).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtHeaderError::MalformedToken
    })
}

/// Decode an Ed25519 public key from a JWK `x` member (base64url, no padding).
///
/// # Errors
///
/// Returns `KeyDecodeError::Encoding` for invalid base64url and
/// `KeyDecodeError::Length` if the result is not 32 bytes.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, KeyDecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(x_b64url)
        .map_err(|e| KeyDecodeError::Encoding(e.to_string()))?;

    if bytes.len() != ED25519_PUBLIC_KEY_LEN {
        return Err(KeyDecodeError::Length {
            expected: ED25519_PUBLIC_KEY_LEN,
            actual: bytes.len(),
        });
    }

    Ok(bytes)
}

// =============================================================================
// Tests
// =============================================================================
