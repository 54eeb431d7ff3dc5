//! Public endpoint integration tests.
//!
//! `/`, `/health` and `/metrics` answer without credentials.

mod support;

use support::{client, TestServer};

/// Test that the root greeting is public.
#[tokio::test]
async fn test_greeting_is_public() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;

    let response = client().get(server.url("/")).send().await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "Casting Agency.");

    Ok(())
}

/// Test that health endpoint returns 200 and healthy status.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;

    let response = client().get(server.url("/health")).send().await?;

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(
        content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");

    Ok(())
}

/// Health does not depend on the key set being reachable.
#[tokio::test]
async fn test_health_ignores_key_set_outage() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;
    server.jwks.fail_with(500).await;

    let response = client().get(server.url("/health")).send().await?;

    assert_eq!(response.status(), 200);
    assert_eq!(server.jwks.fetch_count().await, 0);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;

    let response = client().get(server.url("/nonexistent")).send().await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that the metrics endpoint exposes auth and HTTP series.
#[tokio::test]
async fn test_metrics_endpoint_reports_requests() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;

    // One rejected and one authorized request.
    let rejected = client().get(server.url("/movies")).send().await?;
    assert_eq!(rejected.status(), 401);
    let authorized = client()
        .get(server.url("/movies"))
        .header(
            "Authorization",
            format!("Bearer {}", server.token(&["get:movies"])),
        )
        .send()
        .await?;
    assert_eq!(authorized.status(), 404);

    let response = client().get(server.url("/metrics")).send().await?;
    assert_eq!(response.status(), 200);

    let body = response.text().await?;
    assert!(body.contains("ca_http_requests_total"), "body: {body}");
    assert!(body.contains("ca_token_validations_total"), "body: {body}");
    assert!(body.contains("ca_jwks_refreshes_total"), "body: {body}");

    Ok(())
}
