//! Role-aware guidance handlers

use std::collections::BTreeMap;

use axum::{extract::{Path, Query, State}, Json};

use crate::{AppState, AppResult, AppError};
use crate::logic::advice::{guidance_for, templates as prompt_templates};
use crate::models::{GuidanceQuery, GuidanceResponse};

/// Remediation for a stored alert, phrased for the requested role
pub async fn for_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GuidanceQuery>,
) -> AppResult<Json<GuidanceResponse>> {
    let alert = state
        .alerts
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Alert not found".to_string()))?;

    Ok(Json(guidance_for(&state.advice, &alert, query.role).await))
}

/// Prompt template per role
pub async fn templates() -> Json<BTreeMap<&'static str, &'static str>> {
    Json(prompt_templates())
}
