//! Repository layer for Casting Agency.
//!
//! Handlers talk to the catalog only through this layer.

pub mod catalog;

pub use catalog::CatalogStore;
