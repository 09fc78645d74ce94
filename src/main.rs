//! StreamAdmin - Self-Hosted Streaming Server Admin Backend
//! Mission: Authenticate operators, manage stream keys, edit proxy config

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamadmin_backend::{
    auth::{api as auth_api, authenticate, require_admin, AuthState, JwtHandler, UserStore},
    config_editor::{api as config_api, ConfigState},
    middleware::logging::request_logging,
    settings::Settings,
    streams::{api as stream_api, StreamKeyStore, StreamState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("🚀 StreamAdmin backend starting");

    // Signing configuration and stores are established once, before the
    // listener binds; failure here aborts startup.
    let settings = Settings::from_env().context("Failed to resolve settings")?;

    let user_store = Arc::new(
        UserStore::new(&settings.db_path, settings.bcrypt_cost)
            .context("Failed to initialize user store")?,
    );
    user_store
        .bootstrap_admin(&settings.data_dir, settings.admin_password.as_deref())
        .context("Failed to bootstrap admin account")?;

    let stream_store = Arc::new(
        StreamKeyStore::new(&settings.db_path).context("Failed to initialize stream key store")?,
    );

    let jwt = Arc::new(
        JwtHandler::new(settings.jwt_secret.clone(), settings.realm.clone())
            .with_lifetimes(settings.token_timeout, settings.max_refresh),
    );

    info!("📊 Database initialized at: {}", settings.db_path.display());

    let auth_state = AuthState {
        user_store: user_store.clone(),
        jwt: jwt.clone(),
    };
    let stream_state = StreamState {
        store: stream_store.clone(),
    };
    let config_state = ConfigState {
        conf_path: settings.nginx_conf_path.clone(),
    };

    // Public surface: login/logout/refresh plus the hooks the media server
    // calls on publish.
    let public_routes = Router::new()
        .route("/login", post(auth_api::login))
        .route("/logout", post(auth_api::logout))
        .route("/auth/refresh_token", get(auth_api::refresh_token))
        .with_state(auth_state.clone())
        .merge(
            Router::new()
                .route("/verify-stream", post(stream_api::verify_stream))
                .route("/stream-over", post(stream_api::stream_over))
                .with_state(stream_state.clone()),
        )
        .route("/health", get(health_check));

    // Any valid token.
    let authenticated_routes = Router::new()
        .route("/auth/verify-token", get(auth_api::verify_token))
        .with_state(auth_state.clone())
        .route_layer(middleware::from_fn_with_state(jwt.clone(), authenticate));

    // Admin-only surface: user management, stream keys, proxy config.
    let admin_routes = Router::new()
        .route("/users/", get(auth_api::list_users))
        .route("/users/create", post(auth_api::create_user))
        .route("/users/update", post(auth_api::update_password))
        .route("/users/toggle-admin", post(auth_api::toggle_admin))
        .route("/users/:id", delete(auth_api::delete_user))
        .with_state(auth_state)
        .merge(
            Router::new()
                .route("/streams", get(stream_api::get_streams))
                .route("/create-key", post(stream_api::create_key))
                .route("/streams/:id", delete(stream_api::delete_stream))
                .with_state(stream_state),
        )
        .merge(
            Router::new()
                .route(
                    "/nginx-conf",
                    get(config_api::get_conf).post(config_api::update_conf),
                )
                .with_state(config_state),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(jwt.clone(), authenticate));

    let app = Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    // Start server
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!("🎯 API server listening on {}", settings.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

/// Initialize tracing with env-filter overrides
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamadmin_backend=debug,streamadmin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the manifest directory (common when running with
    // --manifest-path from elsewhere).
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
