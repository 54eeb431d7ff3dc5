//! Casting Agency Service Library
//!
//! A movie and actor catalog API whose routes are gated by permissions
//! carried in externally issued access tokens (Auth0-style JWTs).
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs (AuthGuard) -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, JWKS caching, JWT verification, permissions
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission gate and HTTP metrics middleware
//! - `models` - Catalog records and API bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - In-memory catalog store
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
