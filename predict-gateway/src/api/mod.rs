//! HTTP API.

pub mod health;
pub mod predict;
pub mod services;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;

use crate::logging::request_logger;
use crate::state::AppState;

/// Build the `/api` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::api_root))
        .merge(predict::router())
        .merge(services::router())
}

/// Build the full application with middleware.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", router())
        .route("/health", get(health::health))
        .layer(middleware::from_fn(request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
