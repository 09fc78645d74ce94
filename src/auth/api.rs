//! Authentication API Endpoints
//! Mission: Provide login, token and user management endpoints

use crate::auth::{
    jwt::{JwtHandler, TokenError},
    middleware::{token_from_request, Identity},
    models::{
        status_message, ChangePasswordRequest, CreateUserRequest, LoginRequest,
        ToggleAdminRequest, TokenResponse,
    },
    user_store::UserStore,
};
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub jwt: Arc<JwtHandler>,
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthApiError> {
    info!("🔐 Login attempt: {}", payload.username);

    let verified = state
        .user_store
        .verify_credentials(&payload.username, &payload.password)
        .map_err(|e| {
            warn!("Credential check failed: {e}");
            AuthApiError::StoreUnavailable
        })?;

    let Some((user_id, is_admin)) = verified else {
        warn!("❌ Failed login attempt: {}", payload.username);
        return Err(AuthApiError::InvalidCredentials);
    };

    let signed = state
        .jwt
        .issue(user_id, is_admin)
        .map_err(|_| AuthApiError::Internal)?;

    info!("✅ Login successful: {} (admin: {})", payload.username, is_admin);

    Ok(Json(TokenResponse {
        success: true,
        token: signed.token,
        expire: signed.expire.to_rfc3339(),
        is_admin,
    }))
}

/// Logout endpoint - POST /logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client discards its copy.
pub async fn logout() -> Json<Value> {
    Json(status_message(true, "Logged out"))
}

/// Token check - GET /auth/verify-token
///
/// Runs behind the authentication layer; reaching the handler means the
/// token was valid.
pub async fn verify_token() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Token renewal - GET /auth/refresh_token
///
/// Not behind the authentication layer: an expired token is still
/// refreshable while inside the refresh horizon.
pub async fn refresh_token(
    State(state): State<AuthState>,
    req: Request,
) -> Result<Json<TokenResponse>, AuthApiError> {
    let Some(token) = token_from_request(&req) else {
        return Err(AuthApiError::MissingToken);
    };

    match state.jwt.refresh(&token) {
        Ok(signed) => Ok(Json(TokenResponse {
            success: true,
            token: signed.token,
            expire: signed.expire.to_rfc3339(),
            is_admin: signed.claims.is_admin,
        })),
        Err(TokenError::RefreshExpired) => Err(AuthApiError::RefreshExpired),
        Err(TokenError::Signing) => Err(AuthApiError::Internal),
        Err(_) => Err(AuthApiError::InvalidToken),
    }
}

/// List users - GET /users/ (admin only)
pub async fn list_users(State(state): State<AuthState>) -> Result<Json<Value>, AuthApiError> {
    let users = state.user_store.list_users().map_err(|e| {
        warn!("Failed to list users: {e}");
        AuthApiError::StoreUnavailable
    })?;

    Ok(Json(json!({ "success": true, "users": users })))
}

/// Create user - POST /users/create (admin only)
pub async fn create_user(
    State(state): State<AuthState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Value>, AuthApiError> {
    if payload.username.trim().is_empty() {
        return Err(AuthApiError::MissingUsername);
    }
    if payload.password.len() < 8 {
        return Err(AuthApiError::WeakPassword);
    }

    let user = state
        .user_store
        .create_user(&payload.username, &payload.password, payload.is_admin)
        .map_err(|e| {
            warn!("Failed to create user: {e}");
            AuthApiError::CreateUserFailed
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully inserted new user",
        "newUser": user,
    })))
}

/// Change a user's password - POST /users/update (admin only)
pub async fn update_password(
    State(state): State<AuthState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AuthApiError> {
    if payload.new_password.len() < 8 {
        return Err(AuthApiError::WeakPassword);
    }

    match state.user_store.update_password(
        payload.user_id,
        &payload.old_password,
        &payload.new_password,
    ) {
        Ok(true) => Ok(Json(status_message(
            true,
            "Successfully changed user password!",
        ))),
        Ok(false) => Err(AuthApiError::PasswordChangeRejected),
        Err(e) => {
            warn!("Failed to change password for {}: {e}", payload.user_id);
            Err(AuthApiError::StoreUnavailable)
        }
    }
}

/// Toggle the admin role - POST /users/toggle-admin (admin only)
///
/// Already-issued tokens keep the role they were issued with; the change
/// applies at the affected user's next login.
pub async fn toggle_admin(
    State(state): State<AuthState>,
    Json(payload): Json<ToggleAdminRequest>,
) -> Result<Json<Value>, AuthApiError> {
    match state.user_store.set_admin(payload.user_id, payload.is_admin) {
        Ok(true) => Ok(Json(status_message(
            true,
            "Updated user role, changes apply at next login!",
        ))),
        Ok(false) => Err(AuthApiError::UserNotFound),
        Err(e) => {
            warn!("Failed to toggle role for {}: {e}", payload.user_id);
            Err(AuthApiError::StoreUnavailable)
        }
    }
}

/// Delete user - DELETE /users/:id (admin only)
pub async fn delete_user(
    State(state): State<AuthState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AuthApiError> {
    if user_id == identity.user_id {
        return Err(AuthApiError::CannotDeleteSelf);
    }

    match state.user_store.delete_user(user_id) {
        Ok(true) => Ok(Json(status_message(true, "Deleted user!"))),
        Ok(false) => Err(AuthApiError::UserNotFound),
        Err(e) => {
            warn!("Failed to delete user {user_id}: {e}");
            Err(AuthApiError::StoreUnavailable)
        }
    }
}

/// Auth API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthApiError {
    InvalidCredentials,
    MissingToken,
    InvalidToken,
    RefreshExpired,
    MissingUsername,
    WeakPassword,
    PasswordChangeRejected,
    UserNotFound,
    CannotDeleteSelf,
    CreateUserFailed,
    StoreUnavailable,
    Internal,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Deliberately generic: never reveals which field was wrong.
            AuthApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Login failed!"),
            AuthApiError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "Missing authorization token")
            }
            AuthApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthApiError::RefreshExpired => (
                StatusCode::UNAUTHORIZED,
                "Refresh horizon passed, please log in again!",
            ),
            AuthApiError::MissingUsername => {
                (StatusCode::BAD_REQUEST, "Username must not be empty!")
            }
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 8 characters!",
            ),
            AuthApiError::PasswordChangeRejected => (
                StatusCode::BAD_REQUEST,
                "Invalid password for this user, cannot change!",
            ),
            AuthApiError::UserNotFound => {
                (StatusCode::BAD_REQUEST, "Failed to find user for this ID!")
            }
            AuthApiError::CannotDeleteSelf => {
                (StatusCode::BAD_REQUEST, "Cannot delete your own account!")
            }
            AuthApiError::CreateUserFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to insert new user!",
            ),
            AuthApiError::StoreUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database unavailable, try again later!",
            ),
            AuthApiError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(status_message(false, message))).into_response()
    }
}
