//! Authorization core for Casting Agency.
//!
//! Request flow: [`extract_token`] pulls the bearer token, [`JwtValidator`]
//! verifies it against keys from [`JwksClient`], and [`check_permission`]
//! matches the route's [`PermissionRequirement`]. [`AuthGuard`] runs all
//! three.
//!
//! # Components
//!
//! - `extractor` - Bearer token extraction from the Authorization header
//! - `jwks` - JWKS fetching and caching behind the `KeySource` trait
//! - `jwt` - Signature and claim verification
//! - `claims` - Verified token claims
//! - `permissions` - Permission requirements and checks
//! - `guard` - Composition of the above, plus the `enforce` wrapper

pub mod claims;
pub mod extractor;
pub mod guard;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, ClaimPayload};
pub use extractor::extract_token;
pub use guard::{AuthGuard, Guarded};
pub use jwks::{HttpKeySource, JwksClient, KeySource, SigningKeySet};
pub use jwt::{JwtValidator, VerifierSettings};
pub use permissions::{check_permission, PermissionRequirement};
