//! Bearer token extraction from the `Authorization` header.

use crate::errors::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Pull the bearer token out of a request's headers.
///
/// The header must contain exactly two whitespace-separated parts, the first
/// of which is `bearer` in any case. The second part is returned verbatim;
/// it is not inspected here.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "ca.auth.extractor", "Missing Authorization header");
        AuthError::MissingHeader
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "ca.auth.extractor", "Authorization header is not visible ASCII");
        AuthError::MalformedHeader
    })?;

    let mut parts = value.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        tracing::debug!(target: "ca.auth.extractor", "Authorization header does not have two parts");
        return Err(AuthError::MalformedHeader);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(target: "ca.auth.extractor", "Authorization scheme is not bearer");
        return Err(AuthError::UnsupportedScheme);
    }

    Ok(token)
}
