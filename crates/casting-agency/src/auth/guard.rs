//! Auth guard: extraction, verification and permission check in one step.
//!
//! `AuthGuard::authorize` is what the HTTP middleware calls per request.
//! `AuthGuard::enforce` wraps an arbitrary async handler so that it only
//! ever runs with a fully verified `ClaimPayload`:
//!
//! ```rust,ignore
//! let create_actor = guard.enforce("post:actors", |_claims: ClaimPayload, actor: ActorInput| async move {
//!     store.insert_actor(actor).await
//! });
//!
//! // Runs the handler only if the request is authorized.
//! let created = create_actor.call(&headers, new_actor).await?;
//! ```

use crate::auth::claims::ClaimPayload;
use crate::auth::extractor::extract_token;
use crate::auth::jwt::JwtValidator;
use crate::auth::permissions::{check_permission, PermissionRequirement};
use crate::errors::AuthError;
use axum::http::HeaderMap;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Composes the extractor, verifier and permission checker.
///
/// Holds no per-request state; the only shared mutable state is the key
/// cache inside the validator's `JwksClient`.
pub struct AuthGuard {
    validator: Arc<JwtValidator>,
}

impl AuthGuard {
    pub fn new(validator: Arc<JwtValidator>) -> Self {
        Self { validator }
    }

    /// Authorize a request against `required`.
    ///
    /// # Errors
    ///
    /// The first `AuthError` raised by extraction, verification or the
    /// permission check. Nothing is retried.
    #[instrument(skip_all, name = "ca.auth.guard", fields(required = %required))]
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required: &PermissionRequirement,
    ) -> Result<ClaimPayload, AuthError> {
        let token = extract_token(headers)?;
        let claims = self.validator.verify(token).await?;
        check_permission(required, &claims)?;
        Ok(claims)
    }

    /// Wrap `handler` so it is only invoked after `required` is satisfied.
    pub fn enforce<H>(
        self: &Arc<Self>,
        required: impl Into<PermissionRequirement>,
        handler: H,
    ) -> Guarded<H> {
        Guarded {
            guard: Arc::clone(self),
            required: required.into(),
            handler,
        }
    }
}

/// A handler wrapped by [`AuthGuard::enforce`].
pub struct Guarded<H> {
    guard: Arc<AuthGuard>,
    required: PermissionRequirement,
    handler: H,
}

impl<H> Guarded<H> {
    pub fn requirement(&self) -> &PermissionRequirement {
        &self.required
    }

    /// Authorize the request, then call the handler with the verified claims
    /// followed by `args`.
    ///
    /// # Errors
    ///
    /// Returns the authorization failure without invoking the handler.
    pub async fn call<A, Fut, T>(&self, headers: &HeaderMap, args: A) -> Result<T, AuthError>
    where
        H: Fn(ClaimPayload, A) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.guard.authorize(headers, &self.required).await?;
        Ok((self.handler)(claims, args).await)
    }
}
