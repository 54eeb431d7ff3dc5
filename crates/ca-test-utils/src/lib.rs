//! # Casting Agency Test Utilities
//!
//! Shared test utilities for the Casting Agency service.
//!
//! This crate provides:
//! - Deterministic signing keys (Ed25519 from a seed, one fixed RSA key)
//! - `TestTokenBuilder` for Auth0-style access token claims
//! - `MockJwksServer`, a wiremock-backed JWKS endpoint with request counting
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ca_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::ed25519(1, "kid-1");
//!     let jwks = MockJwksServer::start(&[&keypair]).await;
//!
//!     let token = keypair.sign(
//!         &TestTokenBuilder::new()
//!             .issuer("https://tenant.us.auth0.com/")
//!             .audience("casting_agency")
//!             .permissions(&["get:movies"])
//!             .build(),
//!     );
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;
