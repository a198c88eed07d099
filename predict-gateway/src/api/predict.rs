//! Prediction endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use predict_common::{PredictResponse, PredictionRequest};

use crate::error::{Error, Result};
use crate::state::AppState;

/// Build the predict router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict))
}

/// POST /api/predict - Run the model selected by the request's CPT code.
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    tracing::debug!("Prediction request: {:?}", request);

    let outcome = state.pipeline.run(&request).await?;

    Ok(Json(outcome.into()))
}
