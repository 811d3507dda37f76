//! Alerts handlers

use axum::{extract::{Path, Query, State}, Json};
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{AlertQuery, AlertsResponse, CreateAlert, CreateAlertResponse, EnhancedAlert, MetricsSummary};

/// List alerts with filtering, sorting and pagination
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> AppResult<Json<AlertsResponse>> {
    query.validate()?;
    Ok(Json(state.alerts.list(&query)))
}

/// Get single alert
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<EnhancedAlert>> {
    let alert = state
        .alerts
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Alert not found".to_string()))?;

    Ok(Json(alert))
}

/// Store a caller-supplied alert
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateAlert>,
) -> AppResult<Json<CreateAlertResponse>> {
    req.validate()?;
    let alert = req.into_alert();
    let alert_id = alert.id.clone();
    state.alerts.insert(alert);

    tracing::info!(alert_id = %alert_id, "Alert created");
    Ok(Json(CreateAlertResponse {
        status: "created".to_string(),
        alert_id,
    }))
}

/// Dashboard summary cards
pub async fn metrics_summary(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.alerts.metrics(state.pipeline.status()))
}
