//! Stream Key API Endpoints
//! Mission: Publish hooks for the media server plus admin key management

use crate::auth::models::status_message;
use crate::streams::store::StreamKeyStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Shared stream state
#[derive(Clone)]
pub struct StreamState {
    pub store: Arc<StreamKeyStore>,
}

/// Form body posted by the media server's publish hooks.
#[derive(Debug, Deserialize)]
pub struct StreamHook {
    #[serde(default)]
    pub name: String,
}

/// Publish hook - POST /verify-stream
///
/// The media server posts the key a publisher presented; a known key is
/// marked live, an unknown one refuses the stream.
pub async fn verify_stream(
    State(state): State<StreamState>,
    Form(hook): Form<StreamHook>,
) -> Result<Json<Value>, StreamApiError> {
    set_live(&state, &hook.name, true)
}

/// Publish-done hook - POST /stream-over
pub async fn stream_over(
    State(state): State<StreamState>,
    Form(hook): Form<StreamHook>,
) -> Result<Json<Value>, StreamApiError> {
    set_live(&state, &hook.name, false)
}

fn set_live(
    state: &StreamState,
    key: &str,
    live: bool,
) -> Result<Json<Value>, StreamApiError> {
    if key.is_empty() {
        return Err(StreamApiError::MissingKey);
    }

    match state.store.set_live(key, live) {
        Ok(true) => Ok(Json(status_message(true, "Stream key is good!"))),
        Ok(false) => Err(StreamApiError::UnknownKey),
        Err(e) => {
            warn!("Failed to toggle stream key: {e}");
            Err(StreamApiError::StoreUnavailable)
        }
    }
}

/// List keys - GET /streams (admin only)
pub async fn get_streams(
    State(state): State<StreamState>,
) -> Result<Json<Value>, StreamApiError> {
    let streams = state.store.list().map_err(|e| {
        warn!("Failed to list stream keys: {e}");
        StreamApiError::StoreUnavailable
    })?;

    Ok(Json(json!({ "success": true, "streams": streams })))
}

/// Mint a key - POST /create-key (admin only)
pub async fn create_key(
    State(state): State<StreamState>,
) -> Result<Json<Value>, StreamApiError> {
    let key = state.store.create().map_err(|e| {
        warn!("Failed to create stream key: {e}");
        StreamApiError::CreateFailed
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Insert new stream ok!",
        "stream": key,
    })))
}

/// Delete a key - DELETE /streams/:id (admin only)
pub async fn delete_stream(
    State(state): State<StreamState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StreamApiError> {
    match state.store.delete(id) {
        Ok(true) => Ok(Json(status_message(true, "Deleted stream!"))),
        Ok(false) => Err(StreamApiError::DeleteFailed),
        Err(e) => {
            warn!("Failed to delete stream key {id}: {e}");
            Err(StreamApiError::StoreUnavailable)
        }
    }
}

/// Stream API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamApiError {
    MissingKey,
    UnknownKey,
    CreateFailed,
    DeleteFailed,
    StoreUnavailable,
}

impl IntoResponse for StreamApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            StreamApiError::MissingKey => (
                StatusCode::BAD_REQUEST,
                "Something went wrong getting the stream key!",
            ),
            StreamApiError::UnknownKey => (StatusCode::NOT_FOUND, "No stream key here!"),
            StreamApiError::CreateFailed => {
                (StatusCode::BAD_REQUEST, "Failed to insert new record!")
            }
            StreamApiError::DeleteFailed => {
                (StatusCode::BAD_REQUEST, "Failed to delete existing record!")
            }
            StreamApiError::StoreUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database unavailable, try again later!",
            ),
        };

        (status, Json(status_message(false, message))).into_response()
    }
}
