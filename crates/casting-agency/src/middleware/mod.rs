//! Middleware for Casting Agency.
//!
//! # Components
//!
//! - `auth` - Per-route permission enforcement
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, PermissionGate};
pub use http_metrics::http_metrics_middleware;
