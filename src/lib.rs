pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use sqlx::SqlitePool;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    api::api_error::ApiError,
    config::Config,
    services::{
        covers::{COVERS_ROUTE, CoverStore},
        token::TokenService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub covers: Arc<CoverStore>,
}

impl AppState {
    pub async fn new(db_pool: SqlitePool, config: Arc<Config>) -> Result<Self, ApiError> {
        let covers = CoverStore::new(&config.upload_tmp_dir, &config.covers_dir).await?;

        Ok(AppState {
            db_pool,
            tokens: Arc::new(TokenService::from_config(&config)),
            covers: Arc::new(covers),
            config,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .nest("/api", api::routes())
        .nest_service(COVERS_ROUTE, ServeDir::new(state.covers.covers_dir()))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    if let Some(cors) = cors_layer(state.config.cors_origin.as_deref()) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match origin.parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        Err(_) => {
            tracing::warn!("CORS_ORIGIN {} is not a valid header value; CORS disabled", origin);
            None
        }
    }
}
