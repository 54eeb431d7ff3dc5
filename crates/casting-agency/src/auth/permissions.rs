//! Permission checks against verified claims.
//!
//! Route permissions follow `<verb>:<resource-plural>`, e.g. `get:movies`
//! or `post:actors`. A requirement is attached to a route once, at router
//! construction, and never changes afterwards.

use crate::auth::claims::ClaimPayload;
use crate::errors::AuthError;
use std::fmt;

/// Permission a protected operation demands.
///
/// The empty requirement means "any authenticated caller".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PermissionRequirement(String);

impl PermissionRequirement {
    /// Require a specific permission.
    pub fn new(permission: impl Into<String>) -> Self {
        Self(permission.into())
    }

    /// Require only a verified token.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_authenticated_only(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PermissionRequirement {
    fn from(permission: &str) -> Self {
        Self::new(permission)
    }
}

impl fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authenticated_only() {
            f.write_str("<authenticated>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Check that `claims` satisfy `required`.
///
/// A token without a `permissions` claim is rejected even when the
/// requirement is empty.
pub fn check_permission(
    required: &PermissionRequirement,
    claims: &ClaimPayload,
) -> Result<(), AuthError> {
    let Some(granted) = &claims.permissions else {
        tracing::debug!(target: "ca.auth.permissions", "Token has no permissions claim");
        return Err(AuthError::PermissionsClaimMissing);
    };

    if required.is_authenticated_only() || granted.contains(required.as_str()) {
        return Ok(());
    }

    tracing::debug!(
        target: "ca.auth.permissions",
        required = %required,
        "Permission not granted"
    );
    Err(AuthError::PermissionDenied)
}
