//! Casting Agency error types.
//!
//! `AuthError` is the authorization core's failure taxonomy. `ApiError` is
//! the service-level error returned by handlers; it wraps `AuthError` and
//! maps every variant to an HTTP status via the `IntoResponse` impl.
//!
//! Error messages returned to clients are fixed strings. Underlying causes
//! (reqwest errors, JSON errors) are logged server-side only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authorization failures raised by the token extractor, key set fetcher,
/// token verifier and permission checker.
///
/// Every variant maps to 401 Unauthorized. Only `KeySetUnavailable` is
/// transient; the core never retries any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected")]
    MissingHeader,

    #[error("Authorization header must be bearer token")]
    MalformedHeader,

    #[error("Authorization header must start with bearer")]
    UnsupportedScheme,

    #[error("Token is not a well-formed JWT")]
    MalformedToken,

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Unable to find the appropriate key")]
    UnknownSigningKey,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Incorrect audience")]
    AudienceMismatch,

    #[error("Invalid issuer")]
    IssuerMismatch,

    #[error("Token expired")]
    TokenExpired,

    #[error("Permissions not included in token")]
    PermissionsClaimMissing,

    #[error("Permission not found")]
    PermissionDenied,

    #[error("Signing keys are temporarily unavailable")]
    KeySetUnavailable,
}

impl AuthError {
    /// Stable, machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader => "invalid_header",
            AuthError::UnsupportedScheme => "invalid_scheme",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::AudienceMismatch => "invalid_audience",
            AuthError::IssuerMismatch => "invalid_issuer",
            AuthError::TokenExpired => "token_expired",
            AuthError::PermissionsClaimMissing => "invalid_claims",
            AuthError::PermissionDenied => "unauthorized",
            AuthError::KeySetUnavailable => "key_set_unavailable",
        }
    }

    /// HTTP status code for this error. Always 401.
    pub fn status_code(&self) -> u16 {
        401
    }

    /// Whether an outer policy may reasonably retry the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::KeySetUnavailable)
    }
}

/// Casting Agency service error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Unprocessable: 422 Unprocessable Entity
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized(err) => err.status_code(),
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Unprocessable(_) => 422,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (code, message) = match &self {
            ApiError::Unauthorized(err) => {
                tracing::debug!(target: "ca.errors", code = err.code(), "Request rejected by auth guard");
                (Some(err.code()), err.to_string())
            }
            // Detail is logged; the body keeps the fixed wording clients already rely on.
            ApiError::BadRequest(detail) => {
                tracing::debug!(target: "ca.errors", detail = %detail, "Bad request");
                (None, "Bad request".to_string())
            }
            ApiError::NotFound(detail) => {
                tracing::debug!(target: "ca.errors", detail = %detail, "Resource not found");
                (None, "resource not found".to_string())
            }
            ApiError::Unprocessable(detail) => {
                tracing::warn!(target: "ca.errors", detail = %detail, "Unprocessable request");
                (None, "unprocessable".to_string())
            }
        };

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            code,
            message,
        };

        let mut response = (status, Json(body)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if let ApiError::Unauthorized(err) = &self {
            let challenge = format!(
                "Bearer realm=\"casting-agency\", error=\"invalid_token\", error_description=\"{}\"",
                err.code()
            );
            if let Ok(header_value) = challenge.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ALL_AUTH_ERRORS: [AuthError; 13] = [
        AuthError::MissingHeader,
        AuthError::MalformedHeader,
        AuthError::UnsupportedScheme,
        AuthError::MalformedToken,
        AuthError::MissingKeyId,
        AuthError::UnknownSigningKey,
        AuthError::InvalidSignature,
        AuthError::AudienceMismatch,
        AuthError::IssuerMismatch,
        AuthError::TokenExpired,
        AuthError::PermissionsClaimMissing,
        AuthError::PermissionDenied,
        AuthError::KeySetUnavailable,
    ];

    #[test]
    fn test_auth_errors_are_all_401() {
        for err in ALL_AUTH_ERRORS {
            assert_eq!(err.status_code(), 401, "{err:?}");
        }
    }

    #[test]
    fn test_auth_error_codes_are_unique() {
        let mut codes: Vec<&str> = ALL_AUTH_ERRORS.iter().map(AuthError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL_AUTH_ERRORS.len());
    }

    #[test]
    fn test_only_key_set_unavailable_is_transient() {
        for err in ALL_AUTH_ERRORS {
            assert_eq!(
                err.is_transient(),
                err == AuthError::KeySetUnavailable,
                "{err:?}"
            );
        }
    }

    #[test]
    fn test_display_auth_errors() {
        assert_eq!(
            AuthError::MissingHeader.to_string(),
            "Authorization header is expected"
        );
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            ApiError::from(AuthError::PermissionDenied).to_string(),
            "Unauthorized: Permission not found"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthorized(AuthError::TokenExpired).status_code(),
            401
        );
        assert_eq!(ApiError::BadRequest("test".to_string()).status_code(), 400);
        assert_eq!(ApiError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(
            ApiError::Unprocessable("test".to_string()).status_code(),
            422
        );
    }

    #[tokio::test]
    async fn test_into_response_unauthorized() {
        let response = ApiError::from(AuthError::PermissionDenied).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"casting-agency\""));
        assert!(www_auth.contains("unauthorized"));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 401);
        assert_eq!(body_json["code"], "unauthorized");
        assert_eq!(body_json["message"], "Permission not found");
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response = ApiError::BadRequest("missing title".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 400);
        assert_eq!(body_json["message"], "Bad request");
        assert!(body_json.get("code").is_none());
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = ApiError::NotFound("movie 7".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 404);
        assert_eq!(body_json["message"], "resource not found");
    }

    #[tokio::test]
    async fn test_into_response_unprocessable() {
        let response = ApiError::Unprocessable("age: invalid type".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 422);
        assert_eq!(body_json["message"], "unprocessable");
    }
}
