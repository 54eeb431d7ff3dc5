//! Actor handlers. Same shape as the movie handlers, with `<verb>:actors`
//! permissions.

use crate::auth::ClaimPayload;
use crate::errors::ApiError;
use crate::handlers::payload::{parse_body, parse_id};
use crate::models::{
    ActorCreatedResponse, ActorDeletedResponse, ActorInput, ActorUpdatedResponse, ActorsResponse,
};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /actors (`get:actors`)
///
/// 404 when the catalog has no actors.
#[instrument(skip_all, name = "ca.handlers.list_actors")]
pub async fn list_actors(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActorsResponse>, ApiError> {
    let actors = state.store.list_actors().await;

    if actors.is_empty() {
        return Err(ApiError::NotFound("no actors".to_string()));
    }

    Ok(Json(ActorsResponse {
        success: true,
        actors,
    }))
}

/// Handler for POST /actors (`post:actors`)
#[instrument(skip_all, name = "ca.handlers.create_actor")]
pub async fn create_actor(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActorCreatedResponse>, ApiError> {
    let input: ActorInput = parse_body(body)?;
    let actor = state.store.insert_actor(input).await;

    tracing::info!(target: "ca.handlers.actors", actor_id = actor.id, "Actor created");

    Ok(Json(ActorCreatedResponse {
        success: true,
        actor,
    }))
}

/// Handler for PATCH /actors/:id (`patch:actors`)
#[instrument(skip_all, name = "ca.handlers.update_actor")]
pub async fn update_actor(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActorUpdatedResponse>, ApiError> {
    let id = parse_id(path)?;

    if state.store.get_actor(id).await.is_none() {
        return Err(ApiError::NotFound(format!("actor {id}")));
    }

    let input: ActorInput = parse_body(body)?;

    let updated_actor = state
        .store
        .update_actor(id, input)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("actor {id}")))?;

    tracing::info!(target: "ca.handlers.actors", actor_id = id, "Actor updated");

    Ok(Json(ActorUpdatedResponse {
        success: true,
        updated_actor,
    }))
}

/// Handler for DELETE /actors/:id (`delete:actors`)
#[instrument(skip_all, name = "ca.handlers.delete_actor")]
pub async fn delete_actor(
    Extension(_claims): Extension<ClaimPayload>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<ActorDeletedResponse>, ApiError> {
    let id = parse_id(path)?;

    if !state.store.delete_actor(id).await {
        return Err(ApiError::NotFound(format!("actor {id}")));
    }

    tracing::info!(target: "ca.handlers.actors", actor_id = id, "Actor deleted");

    Ok(Json(ActorDeletedResponse {
        success: true,
        deleted_actor_id: id,
    }))
}
