//! Procedure code listing.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use predict_common::ServicesResponse;

use crate::state::AppState;

/// Build the services router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/services", get(list_services))
}

/// GET /api/services - Known procedure codes and the models they run.
async fn list_services(State(state): State<Arc<AppState>>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: state.pipeline.registry().entries(),
    })
}
