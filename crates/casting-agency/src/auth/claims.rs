//! Verified token claims.
//!
//! `ClaimPayload` is only ever constructed by the token verifier after the
//! signature, audience, issuer and expiry checks have passed. The `sub`
//! field is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The `aud` claim, which issuers may send as a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether this claim names `expected`.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Decoded body of a verified access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayload {
    /// Issuer, e.g. `https://tenant.us.auth0.com/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (user id) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience(s) the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Granted permissions. `None` when the token carries no `permissions`
    /// claim at all, which is distinct from an empty set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for ClaimPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimPayload")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl ClaimPayload {
    /// Check if the token grants a specific permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.contains(permission))
    }
}
