//! Liveness endpoints.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// GET /api - Plain-text liveness check used by the form.
pub async fn api_root() -> &'static str {
    "API is running"
}

/// GET /health - Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}
