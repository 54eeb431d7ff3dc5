//! Common utilities shared across Casting Agency crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified header decoding, key decoding)
pub mod jwt;
