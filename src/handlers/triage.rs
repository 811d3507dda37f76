//! Triage handler

use axum::{extract::State, Json};
use validator::Validate;

use crate::{AppState, AppResult};
use crate::logic::triage::run_triage;
use crate::models::{TriageRequest, TriageResponse};

/// Classify, explain, advise and store one alert
pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<TriageRequest>,
) -> AppResult<Json<TriageResponse>> {
    req.validate()?;
    let response = run_triage(state.pipeline.clone(), &state.advice, &state.alerts, req).await;
    Ok(Json(response))
}
