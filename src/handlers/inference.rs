//! Prediction and explanation handlers

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{AppState, AppResult};
use crate::logic::explain::ExplanationResult;
use crate::logic::features::RawFeatures;
use crate::logic::model::PredictionResult;

/// Any feature mapping; the aligner absorbs whatever shape arrives.
#[derive(Debug, Deserialize)]
pub struct FeaturesRequest {
    #[serde(default)]
    pub features: RawFeatures,
}

/// Classify a feature mapping
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<FeaturesRequest>,
) -> AppResult<Json<PredictionResult>> {
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.predict(&req.features)).await?;
    Ok(Json(result))
}

/// Explain the predicted class of a feature mapping
pub async fn explain(
    State(state): State<AppState>,
    Json(req): Json<FeaturesRequest>,
) -> AppResult<Json<ExplanationResult>> {
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.explain(&req.features)).await?;
    Ok(Json(result))
}
