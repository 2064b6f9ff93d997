use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::refresh::RefreshTokenManager;
use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::services::{AuthService, SeaOrmAuthService};
use crate::state::SharedState;

mod error;
mod types;
pub mod users;

pub use error::ApiError;
pub use types::ApiResponse;

use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub auth: Arc<dyn AuthService>,

    pub signer: Arc<TokenSigner>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    let config = shared.config.read().await.clone();

    // Fail fast: refuse to start without usable signing material.
    let signer = Arc::new(TokenSigner::from_config(&config.auth)?);

    let refresh_tokens =
        RefreshTokenManager::new(shared.store.clone(), config.auth.refresh_token_ttl_days);

    let auth = Arc::new(SeaOrmAuthService::new(
        shared.store.clone(),
        signer.clone(),
        refresh_tokens,
        config.security.clone(),
    ));

    Ok(Arc::new(AppState {
        shared,
        auth,
        signer,
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.config().read().await;
        config.server.cors_allowed_origins.clone()
    };

    let protected_routes = Router::new()
        .route("/users/{id}/change-password", put(users::change_password))
        .route("/users/logout", post(users::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            users::require_bearer,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/users/login", post(users::login))
        .route("/users/refresh-token", post(users::refresh_token))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
