//! Model lifecycle handlers

use axum::{extract::State, Json};

use crate::{AppState, AppResult};
use crate::logic::pipeline::EngineStatus;

pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.pipeline.status())
}

/// Re-resolve artifacts and reload schema, model and explainer
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<EngineStatus>> {
    let pipeline = state.pipeline.clone();
    let status = tokio::task::spawn_blocking(move || pipeline.reload()).await?;
    Ok(Json(status))
}
