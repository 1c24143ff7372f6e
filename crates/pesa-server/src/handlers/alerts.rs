//! Alert handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, SuccessResponse};
use pesa_core::models::Alert;
use pesa_core::PeriodKey;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// POST /api/alerts/:user_id/generate - Run the rules for the current month
pub async fn generate_alerts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = state
        .rules
        .generate_and_persist(&state.db, &user_id, PeriodKey::current())?;
    Ok(Json(alerts))
}

/// GET /api/alerts/:user_id - List a user's alerts
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = state.db.list_alerts(&user_id, params.unread_only)?;
    Ok(Json(alerts))
}

/// POST /api/alerts/read/:id - Mark an alert as read
pub async fn mark_alert_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.mark_alert_read(id)? {
        return Err(AppError::not_found("Alert not found"));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// Explanation of a single alert
#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub alert_id: i64,
    /// None when no explanation could be generated
    pub explanation: Option<String>,
    pub cached: bool,
}

/// POST /api/alerts/:user_id/:id/explain - Explain an alert using recent transactions
pub async fn explain_alert(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(String, i64)>,
) -> Result<Json<ExplainResponse>, AppError> {
    let alert = state
        .db
        .get_alert(id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Alert not found"))?;

    let recent = state
        .db
        .list_transactions(&user_id, state.config.insights.summary_size as i64)?;
    let explanation = state.explainer.explain(&user_id, &alert, &recent).await?;

    Ok(Json(ExplainResponse {
        alert_id: alert.id,
        cached: explanation.as_ref().is_some_and(|e| e.cached),
        explanation: explanation.map(|e| e.response),
    }))
}
