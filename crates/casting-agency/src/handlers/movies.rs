//! Movie handlers.
//!
//! Every route here sits behind a `PermissionGate`; handlers only run with a
//! verified `ClaimPayload` in request extensions.

use crate::auth::ClaimPayload;
use crate::errors::ApiError;
use crate::handlers::payload::{parse_body, parse_id};
use crate::models::{
    MovieCreatedResponse, MovieDeletedResponse, MovieInput, MovieUpdatedResponse, MoviesResponse,
};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /movies (`get:movies`)
///
/// 404 when the catalog has no movies.
#[instrument(skip_all, name = "ca.handlers.list_movies")]
pub async fn list_movies(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MoviesResponse>, ApiError> {
    let movies = state.store.list_movies().await;

    if movies.is_empty() {
        return Err(ApiError::NotFound("no movies".to_string()));
    }

    Ok(Json(MoviesResponse {
        success: true,
        movies,
    }))
}

/// Handler for POST /movies (`post:movies`)
#[instrument(skip_all, name = "ca.handlers.create_movie")]
pub async fn create_movie(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MovieCreatedResponse>, ApiError> {
    let input: MovieInput = parse_body(body)?;
    let movie = state.store.insert_movie(input).await;

    tracing::info!(target: "ca.handlers.movies", movie_id = movie.id, "Movie created");

    Ok(Json(MovieCreatedResponse {
        success: true,
        movie,
    }))
}

/// Handler for PATCH /movies/:id (`patch:movies`)
///
/// An unknown id is reported before the body is looked at.
#[instrument(skip_all, name = "ca.handlers.update_movie")]
pub async fn update_movie(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MovieUpdatedResponse>, ApiError> {
    let id = parse_id(path)?;

    if state.store.get_movie(id).await.is_none() {
        return Err(ApiError::NotFound(format!("movie {id}")));
    }

    let input: MovieInput = parse_body(body)?;

    // Deleted between the lookup and the write.
    let updated_movie = state
        .store
        .update_movie(id, input)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("movie {id}")))?;

    tracing::info!(target: "ca.handlers.movies", movie_id = id, "Movie updated");

    Ok(Json(MovieUpdatedResponse {
        success: true,
        updated_movie,
    }))
}

/// Handler for DELETE /movies/:id (`delete:movies`)
#[instrument(skip_all, name = "ca.handlers.delete_movie")]
pub async fn delete_movie(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<MovieDeletedResponse>, ApiError> {
    let id = parse_id(path)?;

    if !state.store.delete_movie(id).await {
        return Err(ApiError::NotFound(format!("movie {id}")));
    }

    tracing::info!(target: "ca.handlers.movies", movie_id = id, "Movie deleted");

    Ok(Json(MovieDeletedResponse {
        success: true,
        deleted_movie_id: id,
    }))
}
