//! Savings tracking handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{core_error, AppError, AppState};
use meterly_core::SavingsTracking;

/// Body for starting a tracking row
#[derive(Debug, Deserialize)]
pub struct StartTrackingPayload {
    pub recommendation_id: i64,
}

/// Query parameters for listing trackings. `from`/`to` bound the tracking
/// month inclusively and must be given together.
#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TotalSavingsResponse {
    pub total_savings: Decimal,
}

/// POST /api/users/:user_id/savings - Start tracking a recommendation
pub async fn start_savings_tracking(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<StartTrackingPayload>,
) -> Result<(StatusCode, Json<SavingsTracking>), AppError> {
    let tracking = state
        .engine
        .start_savings_tracking(user_id, payload.recommendation_id)
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(tracking)))
}

/// POST /api/users/:user_id/savings/:id/refresh - Recompute a row's actuals
pub async fn refresh_savings_tracking(
    State(state): State<Arc<AppState>>,
    Path((user_id, tracking_id)): Path<(i64, i64)>,
) -> Result<Json<SavingsTracking>, AppError> {
    let tracking = state
        .engine
        .refresh_savings_tracking(user_id, tracking_id)
        .map_err(core_error)?;
    Ok(Json(tracking))
}

/// GET /api/users/:user_id/savings - List tracking rows
pub async fn list_savings_trackings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<TrackingQuery>,
) -> Result<Json<Vec<SavingsTracking>>, AppError> {
    let trackings = match (params.from, params.to) {
        (Some(from), Some(to)) => state.db().list_trackings_between(user_id, from, to)?,
        (None, None) => state.db().list_trackings(user_id)?,
        _ => {
            return Err(AppError::bad_request(
                "from and to must be provided together",
            ))
        }
    };
    Ok(Json(trackings))
}

/// GET /api/users/:user_id/savings/total - Sum of achieved savings
pub async fn total_savings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<TotalSavingsResponse>, AppError> {
    let total = state.engine.total_savings(user_id)?;
    Ok(Json(TotalSavingsResponse {
        total_savings: total,
    }))
}
