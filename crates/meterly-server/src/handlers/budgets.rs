//! Budget setting handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{AppError, AppState};
use meterly_core::BudgetSetting;

/// Body for replacing budget settings
#[derive(Debug, Deserialize)]
pub struct BudgetPayload {
    pub monthly_budget: Option<Decimal>,
    /// Percentage of the budget at which the budget alert fires
    pub alert_threshold: Option<Decimal>,
}

/// GET /api/users/:user_id/budget - Current budget settings
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<BudgetSetting>, AppError> {
    state
        .db()
        .find_budget(user_id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("No budget configured"))
}

/// PUT /api/users/:user_id/budget - Create or replace budget settings
pub async fn upsert_budget(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<BudgetPayload>,
) -> Result<Json<BudgetSetting>, AppError> {
    if matches!(payload.monthly_budget, Some(b) if b < Decimal::ZERO) {
        return Err(AppError::bad_request("monthly_budget must not be negative"));
    }
    if matches!(payload.alert_threshold, Some(t) if t < Decimal::ZERO || t > Decimal::from(100)) {
        return Err(AppError::bad_request(
            "alert_threshold must be between 0 and 100",
        ));
    }

    let budget = state
        .db()
        .upsert_budget(user_id, payload.monthly_budget, payload.alert_threshold)?;
    Ok(Json(budget))
}
