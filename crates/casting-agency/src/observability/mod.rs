//! Observability for Casting Agency.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
