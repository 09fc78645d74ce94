//! Configuration API Endpoints
//! Mission: Let administrators read and replace the proxy configuration

use crate::auth::models::status_message;
use crate::config_editor::validate::is_valid_conf;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};

/// Shared config editor state
#[derive(Clone)]
pub struct ConfigState {
    pub conf_path: PathBuf,
}

/// Replacement configuration content
#[derive(Debug, Deserialize)]
pub struct ConfUpdate {
    pub content: String,
}

/// Fetch the configuration - GET /nginx-conf (admin only)
pub async fn get_conf(State(state): State<ConfigState>) -> Result<Json<Value>, ConfigApiError> {
    let content = tokio::fs::read_to_string(&state.conf_path)
        .await
        .map_err(|e| {
            warn!("Failed to read {}: {e}", state.conf_path.display());
            ConfigApiError::ReadFailed
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully fetched nginx conf for editing.",
        "content": content,
    })))
}

/// Replace the configuration - POST /nginx-conf (admin only)
///
/// Empty or structurally invalid content is refused before anything is
/// written over the live file.
pub async fn update_conf(
    State(state): State<ConfigState>,
    Json(update): Json<ConfUpdate>,
) -> Result<Json<Value>, ConfigApiError> {
    if update.content.is_empty() {
        return Err(ConfigApiError::EmptyContent);
    }
    if !is_valid_conf(&update.content) {
        return Err(ConfigApiError::InvalidConf);
    }

    tokio::fs::write(&state.conf_path, update.content.as_bytes())
        .await
        .map_err(|e| {
            warn!("Failed to write {}: {e}", state.conf_path.display());
            ConfigApiError::WriteFailed
        })?;

    info!("💾 Saved modified proxy configuration to {}", state.conf_path.display());

    Ok(Json(status_message(
        true,
        "Successfully saved modified nginx conf.",
    )))
}

/// Config API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigApiError {
    EmptyContent,
    InvalidConf,
    ReadFailed,
    WriteFailed,
}

impl IntoResponse for ConfigApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ConfigApiError::EmptyContent => {
                (StatusCode::BAD_REQUEST, "Content is empty, not saving file")
            }
            ConfigApiError::InvalidConf => (StatusCode::BAD_REQUEST, "Invalid config"),
            ConfigApiError::ReadFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read nginx conf for editing.",
            ),
            ConfigApiError::WriteFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Cannot save content")
            }
        };

        (status, Json(status_message(false, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_state() -> (ConfigState, TempDir) {
        let dir = TempDir::new().unwrap();
        let conf_path = dir.path().join("nginx.conf");
        std::fs::write(&conf_path, "worker_processes 1;\n").unwrap();
        (ConfigState { conf_path }, dir)
    }

    #[tokio::test]
    async fn test_get_conf_returns_file_content() {
        let (state, _dir) = test_state();

        let response = get_conf(State(state)).await.unwrap();
        assert_eq!(response.0["success"], true);
        assert_eq!(response.0["content"], "worker_processes 1;\n");
    }

    #[tokio::test]
    async fn test_get_conf_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = ConfigState {
            conf_path: dir.path().join("missing.conf"),
        };

        let err = get_conf(State(state)).await.unwrap_err();
        assert_eq!(err, ConfigApiError::ReadFailed);
    }

    #[tokio::test]
    async fn test_update_conf_round_trip() {
        let (state, _dir) = test_state();
        let replacement = "events {\n    worker_connections 512;\n}\n";

        let response = update_conf(
            State(state.clone()),
            Json(ConfUpdate {
                content: replacement.to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0["success"], true);

        let written = std::fs::read_to_string(&state.conf_path).unwrap();
        assert_eq!(written, replacement);
    }

    #[tokio::test]
    async fn test_update_conf_rejects_empty_and_invalid() {
        let (state, _dir) = test_state();

        let empty = update_conf(
            State(state.clone()),
            Json(ConfUpdate {
                content: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(empty, ConfigApiError::EmptyContent);

        let invalid = update_conf(
            State(state.clone()),
            Json(ConfUpdate {
                content: "events {\n".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(invalid, ConfigApiError::InvalidConf);

        // The original file is untouched after rejected updates.
        let untouched = std::fs::read_to_string(&state.conf_path).unwrap();
        assert_eq!(untouched, "worker_processes 1;\n");
    }
}
