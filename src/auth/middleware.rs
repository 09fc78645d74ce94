//! Authentication Middleware
//! Mission: Reconstruct identities from requests and gate protected routes

use crate::auth::jwt::{JwtHandler, TokenError};
use crate::auth::models::status_message;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Per-request identity derived from a validated token. Lives in the
/// request extensions and is discarded with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub is_admin: bool,
}

/// Auth error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidSignature,
    TokenExpired,
    InsufficientRole,
}

impl AuthError {
    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidSignature => "Invalid token",
            AuthError::TokenExpired => "Token expired please renew!",
            AuthError::InsufficientRole => {
                "You don't have permission to access this resource!"
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(status_message(false, self.message())),
        )
            .into_response()
    }
}

/// Locate the bearer token in a request.
///
/// Fixed priority order: Authorization header, then the `token` query
/// parameter, then the `jwt` cookie.
pub fn token_from_request(req: &Request) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    if let Some(query) = req.uri().query() {
        if let Some(token) = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .filter(|t| !t.is_empty())
        {
            return Some(token.to_string());
        }
    }

    req.headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("jwt="))
        })
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// Middleware that validates the presented token and attaches an
/// `Identity` to the request for downstream handlers.
pub async fn authenticate(
    State(jwt): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = token_from_request(&req) else {
        return Err(unauthorized(&jwt, AuthError::MissingToken));
    };

    match jwt.verify(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(Identity {
                user_id: claims.sub,
                is_admin: claims.is_admin,
            });
            Ok(next.run(req).await)
        }
        Err(TokenError::TokenExpired) => Err(unauthorized(&jwt, AuthError::TokenExpired)),
        Err(_) => Err(unauthorized(&jwt, AuthError::InvalidSignature)),
    }
}

/// Middleware gating admin-only routes. Layered inside `authenticate`;
/// anything without an admin identity gets the same generic rejection.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    match req.extensions().get::<Identity>() {
        Some(identity) if identity.is_admin => Ok(next.run(req).await),
        _ => Err(AuthError::InsufficientRole),
    }
}

/// 401 with the realm challenge header attached.
fn unauthorized(jwt: &JwtHandler, err: AuthError) -> Response {
    let mut resp = err.into_response();
    if let Ok(value) = format!("Bearer realm=\"{}\"", jwt.realm()).parse() {
        resp.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    resp
}
