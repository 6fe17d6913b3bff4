use axum::{
    Router,
    http::HeaderValue,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;

mod accounts;
pub mod auth;
mod error;
mod permissions;
mod products;
mod validation;

pub use error::{ApiError, FieldErrors};

pub struct AppState {
    pub store: Store,
    pub config: Config,
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    config.validate()?;

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState { store, config }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    // Trailing slashes are part of the route contract, not a convention.
    let api_router = Router::new()
        .route(
            "/accounts/",
            post(accounts::register).get(accounts::list_accounts),
        )
        .route("/accounts/newest/{n}/", get(accounts::newest_accounts))
        .route("/accounts/{id}/", patch(accounts::update_account))
        .route("/accounts/{id}/management/", patch(accounts::change_active))
        .route("/login/", post(auth::login))
        .route(
            "/products/",
            post(products::create_product).get(products::list_products),
        )
        .route(
            "/products/{id}/",
            get(products::retrieve_product).patch(products::update_product),
        )
        .with_state(state);

    let cors_layer = if cors_origins.is_empty() || cors_origins.contains(&"*".to_string()) {
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
