//! HTTP-level tests for the auth surface.
//!
//! The router is assembled inside the test with the same wiring as the
//! binary and driven in-process with `tower::ServiceExt`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use streamadmin_backend::auth::{
    api as auth_api, authenticate, require_admin, AuthState, JwtHandler, UserStore,
};

const SECRET: &str = "test-secret-key-12345";
const ADMIN_PASSWORD: &str = "admin-pass-123";

fn test_router(data_dir: &std::path::Path) -> Router {
    let user_store = Arc::new(
        UserStore::new(data_dir.join("sqlite-database.db"), 4).unwrap(),
    );
    user_store
        .bootstrap_admin(data_dir, Some(ADMIN_PASSWORD))
        .unwrap();
    let jwt = Arc::new(JwtHandler::new(SECRET.to_string(), "test zone".to_string()));
    let auth_state = AuthState {
        user_store,
        jwt: jwt.clone(),
    };

    let public = Router::new()
        .route("/login", post(auth_api::login))
        .route("/logout", post(auth_api::logout))
        .route("/auth/refresh_token", get(auth_api::refresh_token))
        .with_state(auth_state.clone());

    let authenticated = Router::new()
        .route("/auth/verify-token", get(auth_api::verify_token))
        .with_state(auth_state.clone())
        .route_layer(middleware::from_fn_with_state(jwt.clone(), authenticate));

    let admin = Router::new()
        .route("/users/", get(auth_api::list_users))
        .route("/users/create", post(auth_api::create_user))
        .route("/users/update", post(auth_api::update_password))
        .route("/users/toggle-admin", post(auth_api::toggle_admin))
        .route("/users/:id", delete(auth_api::delete_user))
        .with_state(auth_state)
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(jwt, authenticate));

    Router::new().merge(public).merge(authenticated).merge(admin)
}

fn request(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(t) = token {
        builder = builder.header("Authorization", format!("Bearer {t}"));
    }
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn login(router: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        router,
        request(
            "POST",
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        ),
    )
    .await
}

#[tokio::test]
async fn test_login_with_bootstrap_admin() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (status, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["isAdmin"], true);
    assert!(!body["token"].as_str().unwrap().is_empty());

    // expire is RFC3339 and in the future.
    let expire = DateTime::parse_from_rfc3339(body["expire"].as_str().unwrap()).unwrap();
    assert!(expire > Utc::now());
}

#[tokio::test]
async fn test_failed_logins_are_indistinguishable() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (wrong_status, wrong_body) = login(&router, "admin", "bad-password").await;
    let (unknown_status, unknown_body) = login(&router, "nobody", ADMIN_PASSWORD).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    // Same generic body either way: no hint about which field was wrong.
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["success"], false);
}

#[tokio::test]
async fn test_verify_token() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let token = body["token"].as_str().unwrap();

    let (status, body) = send(
        &router,
        request("GET", "/auth/verify-token", Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&router, request("GET", "/auth/verify-token", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &router,
        request("GET", "/auth/verify-token", Some("garbage.token.here"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_expired_token_rejected_with_renew_message() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    // Sign an already-expired token under the same secret.
    let now = Utc::now().timestamp();
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": 1, "isAdmin": true, "iat": now - 120, "exp": now - 60 }),
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(
        &router,
        request("GET", "/auth/verify-token", Some(&expired), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired please renew!");
}

#[tokio::test]
async fn test_token_accepted_from_query_and_cookie() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let token = body["token"].as_str().unwrap();

    let (status, _) = send(
        &router,
        request(
            "GET",
            &format!("/auth/verify-token?token={token}"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .method("GET")
        .uri("/auth/verify-token")
        .header("Cookie", format!("jwt={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let token = body["token"].as_str().unwrap();

    let (status, refreshed) = send(
        &router,
        request("GET", "/auth/refresh_token", Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["success"], true);
    assert_eq!(refreshed["isAdmin"], true);

    // The renewed token works on protected routes.
    let renewed = refreshed["token"].as_str().unwrap();
    let (status, _) = send(
        &router,
        request("GET", "/auth/verify-token", Some(renewed), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_past_horizon_requires_relogin() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    // Issued 90 minutes ago, well past the 60-minute horizon.
    let now = Utc::now().timestamp();
    let stale = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": 1, "isAdmin": true, "iat": now - 90 * 60, "exp": now - 30 * 60 }),
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(
        &router,
        request("GET", "/auth/refresh_token", Some(&stale), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_user_management_requires_admin() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let admin_token = body["token"].as_str().unwrap().to_string();

    // Admin creates a non-admin operator.
    let (status, created) = send(
        &router,
        request(
            "POST",
            "/users/create",
            Some(&admin_token),
            Some(json!({ "username": "operator", "password": "billyBob92", "isAdmin": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    assert_eq!(created["newUser"]["isAdmin"], false);

    // The operator can log in but cannot touch user management.
    let (status, body) = login(&router, "operator", "billyBob92").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], false);
    let operator_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        request("GET", "/users/", Some(&operator_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The admin can.
    let (status, listing) = send(
        &router,
        request("GET", "/users/", Some(&admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let users = listing["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    // Admins sort first.
    assert_eq!(users[0]["username"], "admin");
}

#[tokio::test]
async fn test_role_change_applies_at_next_login() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let admin_token = body["token"].as_str().unwrap().to_string();

    let (_, created) = send(
        &router,
        request(
            "POST",
            "/users/create",
            Some(&admin_token),
            Some(json!({ "username": "operator", "password": "billyBob92", "isAdmin": false })),
        ),
    )
    .await;
    let operator_id = created["newUser"]["userId"].as_i64().unwrap();

    let (_, body) = login(&router, "operator", "billyBob92").await;
    let old_token = body["token"].as_str().unwrap().to_string();

    // Promote the operator.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/users/toggle-admin",
            Some(&admin_token),
            Some(json!({ "userId": operator_id, "isAdmin": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The already-issued token keeps its original role.
    let (status, _) = send(&router, request("GET", "/users/", Some(&old_token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login picks up the new role.
    let (_, body) = login(&router, "operator", "billyBob92").await;
    assert_eq!(body["isAdmin"], true);
    let new_token = body["token"].as_str().unwrap();
    let (status, _) = send(&router, request("GET", "/users/", Some(new_token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_password_and_delete_user() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let admin_token = body["token"].as_str().unwrap().to_string();

    let (_, created) = send(
        &router,
        request(
            "POST",
            "/users/create",
            Some(&admin_token),
            Some(json!({ "username": "operator", "password": "billyBob92", "isAdmin": false })),
        ),
    )
    .await;
    let operator_id = created["newUser"]["userId"].as_i64().unwrap();

    // Wrong old password is refused.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/users/update",
            Some(&admin_token),
            Some(json!({
                "userId": operator_id,
                "oldPassword": "wrong-old",
                "newPassword": "billyBob93xyz"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Correct old password goes through and the new one works.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/users/update",
            Some(&admin_token),
            Some(json!({
                "userId": operator_id,
                "oldPassword": "billyBob92",
                "newPassword": "billyBob93xyz"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&router, "operator", "billyBob93xyz").await;
    assert_eq!(status, StatusCode::OK);

    // Deleting yourself is refused, deleting the operator is not.
    let (_, listing) = send(&router, request("GET", "/users/", Some(&admin_token), None)).await;
    let admin_id = listing["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "admin")
        .unwrap()["userId"]
        .as_i64()
        .unwrap();

    let (status, _) = send(
        &router,
        request(
            "DELETE",
            &format!("/users/{admin_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        request(
            "DELETE",
            &format!("/users/{operator_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = login(&router, "operator", "billyBob93xyz").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_stateless() {
    let dir = TempDir::new().unwrap();
    let router = test_router(dir.path());

    let (_, body) = login(&router, "admin", ADMIN_PASSWORD).await;
    let token = body["token"].as_str().unwrap();

    let (status, body) = send(&router, request("POST", "/logout", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // No server-side revocation: the token still verifies until it expires.
    let (status, _) = send(
        &router,
        request("GET", "/auth/verify-token", Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
