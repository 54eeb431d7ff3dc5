//! Request body and path parsing shared by the catalog handlers.

use crate::errors::ApiError;
use crate::models::RequiredFields;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Turn a raw JSON body into `T`.
///
/// - not JSON, or not an object: 400
/// - a required member is absent: 400
/// - members present but of the wrong type: 422
pub(crate) fn parse_body<T>(body: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError>
where
    T: DeserializeOwned + RequiredFields,
{
    let Json(value) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let Some(object) = value.as_object() else {
        return Err(ApiError::BadRequest("body is not a JSON object".to_string()));
    };

    if let Some(missing) = T::REQUIRED.iter().find(|field| !object.contains_key(**field)) {
        return Err(ApiError::BadRequest(format!("missing field `{missing}`")));
    }

    serde_json::from_value(value).map_err(|e| ApiError::Unprocessable(e.to_string()))
}

/// A non-numeric id cannot name a record, so it is a 404 rather than a 400.
pub(crate) fn parse_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::NotFound(e.body_text()))
}
