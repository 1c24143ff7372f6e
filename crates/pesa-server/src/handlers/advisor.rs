//! Advice, contextual insight and health handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{AppError, AppState};
use pesa_core::advisor::contextual_insights as analyze_records;
use pesa_core::ai::TextGenerator;
use pesa_core::health::{health_from_transactions, window_start, HealthReport};
use pesa_core::models::TransactionRecord;
use pesa_core::{ContextualInsights, Degradation, PeriodKey};

/// GET /health - Liveness and generator status
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let generator = match &state.ai {
        Some(client) => json!({
            "configured": true,
            "host": client.host(),
            "model": client.model(),
        }),
        None => json!({ "configured": false }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "generator": generator,
    }))
}

/// GET /api/advisor/:user_id - Cached or freshly generated advice
///
/// Advice that was generated but could not be stored is still returned, with
/// a 500 status so callers know the cache is behind.
pub async fn get_advice(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.advisor.get_advice(&user_id).await?;

    if outcome.degradation == Some(Degradation::NotPersisted) {
        error!(user_id = %user_id, "Returning advice that was not persisted");
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(outcome)).into_response());
    }

    Ok(Json(outcome).into_response())
}

/// Request body for contextual insights
#[derive(Debug, Deserialize)]
pub struct ContextualInsightsRequest {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default, alias = "savingsGoal")]
    pub savings_goal: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// POST /api/advisor/:user_id/contextual-insights - Insights over supplied transactions
pub async fn contextual_insights(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<ContextualInsightsRequest>,
) -> Result<Json<ContextualInsights>, AppError> {
    let currency = body
        .currency
        .as_deref()
        .unwrap_or(&state.config.advice.currency);

    let insights = analyze_records(&user_id, &body.transactions, body.savings_goal, currency)?;
    Ok(Json(insights))
}

/// GET /api/advisor/:user_id/health - Health score over recent months
pub async fn financial_health(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<HealthReport>, AppError> {
    let through = PeriodKey::current();
    let transactions = state
        .db
        .transactions_between(&user_id, window_start(through), through)?;

    Ok(Json(health_from_transactions(&transactions)))
}
