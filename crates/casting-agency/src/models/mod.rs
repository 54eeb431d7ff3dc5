//! Casting Agency models.
//!
//! Catalog records and the request/response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,
}

// ============================================================================
// Catalog records
// ============================================================================

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub release_date: String,
}

/// An actor in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub age: u32,
    pub gender: String,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Fields a client must supply to create or replace a record.
pub trait RequiredFields {
    /// JSON member names that must be present.
    const REQUIRED: &'static [&'static str];
}

/// Body of `POST /movies` and `PATCH /movies/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MovieInput {
    pub title: String,
    pub release_date: String,
}

impl RequiredFields for MovieInput {
    const REQUIRED: &'static [&'static str] = &["title", "release_date"];
}

/// Body of `POST /actors` and `PATCH /actors/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActorInput {
    pub name: String,
    pub age: u32,
    pub gender: String,
}

impl RequiredFields for ActorInput {
    const REQUIRED: &'static [&'static str] = &["name", "age", "gender"];
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviesResponse {
    pub success: bool,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieCreatedResponse {
    pub success: bool,
    pub movie: Movie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieUpdatedResponse {
    pub success: bool,
    pub updated_movie: Movie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDeletedResponse {
    pub success: bool,
    pub deleted_movie_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorsResponse {
    pub success: bool,
    pub actors: Vec<Actor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorCreatedResponse {
    pub success: bool,
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorUpdatedResponse {
    pub success: bool,
    pub updated_actor: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDeletedResponse {
    pub success: bool,
    pub deleted_actor_id: u64,
}
