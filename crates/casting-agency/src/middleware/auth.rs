//! Permission middleware for protected routes.
//!
//! Each protected route gets its own [`PermissionGate`] naming the single
//! permission it requires. The gate runs the [`AuthGuard`] before the
//! handler (and before any body extractor), then stores the verified
//! [`ClaimPayload`] in request extensions so handlers can take
//! `Extension<ClaimPayload>`.

use crate::auth::{AuthGuard, ClaimPayload, PermissionRequirement};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for [`require_permission`]: the shared guard plus this route's
/// requirement.
#[derive(Clone)]
pub struct PermissionGate {
    guard: Arc<AuthGuard>,
    required: PermissionRequirement,
}

impl PermissionGate {
    pub fn new(guard: Arc<AuthGuard>, required: impl Into<PermissionRequirement>) -> Self {
        Self {
            guard,
            required: required.into(),
        }
    }

    pub fn requirement(&self) -> &PermissionRequirement {
        &self.required
    }
}

/// Authorize the request for the gate's permission.
///
/// # Response
///
/// - 401 Unauthorized with `WWW-Authenticate` on any authorization failure;
///   the handler is not invoked
/// - Otherwise continues with the claims in request extensions
#[instrument(skip_all, name = "ca.middleware.auth", fields(required = %gate.required))]
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let claims = gate.guard.authorize(req.headers(), &gate.required).await?;

    req.extensions_mut().insert::<ClaimPayload>(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::mock::MockKeySource;
    use crate::auth::{JwksClient, JwtValidator, KeySource, VerifierSettings};
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use ca_test_utils::{jwks_json, TestKeypair, TestTokenBuilder};
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const AUDIENCE: &str = "casting_agency";
    const ISSUER: &str = "https://tenant.us.auth0.com/";

    fn guard_for(keypair: &TestKeypair) -> Arc<AuthGuard> {
        let source: Arc<dyn KeySource> = Arc::new(MockKeySource::serving(jwks_json(&[keypair])));
        let validator = JwtValidator::new(
            Arc::new(JwksClient::new(source)),
            VerifierSettings {
                audience: AUDIENCE.to_string(),
                issuer: ISSUER.to_string(),
                algorithms: vec![Algorithm::EdDSA],
                require_iss_exp: false,
            },
        );
        Arc::new(AuthGuard::new(Arc::new(validator)))
    }

    fn app(guard: Arc<AuthGuard>, calls: Arc<AtomicUsize>) -> Router {
        let handler = move |Extension(claims): Extension<ClaimPayload>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                claims.sub.unwrap_or_default()
            }
        };

        Router::new().route(
            "/movies",
            get(handler).route_layer(middleware::from_fn_with_state(
                PermissionGate::new(guard, "get:movies"),
                require_permission,
            )),
        )
    }

    fn request(authorization: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method("GET").uri("/movies");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn token(keypair: &TestKeypair, permissions: &[&str]) -> String {
        keypair.sign(
            &TestTokenBuilder::new()
                .issuer(ISSUER)
                .audience(AUDIENCE)
                .subject("auth0|producer")
                .permissions(permissions)
                .build(),
        )
    }

    #[test]
    fn test_permission_gate_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<PermissionGate>();
    }

    #[tokio::test]
    async fn test_claims_reach_handler() {
        let keypair = TestKeypair::ed25519(11, "kid-1");
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(guard_for(&keypair), Arc::clone(&calls));

        let bearer = format!("Bearer {}", token(&keypair, &["get:movies"]));
        let response = app.oneshot(request(Some(&bearer))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_permission_is_401_and_skips_handler() {
        let keypair = TestKeypair::ed25519(11, "kid-1");
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(guard_for(&keypair), Arc::clone(&calls));

        let bearer = format!("Bearer {}", token(&keypair, &["get:actors"]));
        let response = app.oneshot(request(Some(&bearer))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("WWW-Authenticate"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let keypair = TestKeypair::ed25519(11, "kid-1");
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(guard_for(&keypair), Arc::clone(&calls));

        let response = app.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
