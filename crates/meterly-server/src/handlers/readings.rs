//! Meter reading handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{core_error, AppError, AppState};
use meterly_core::{NewReading, Reading, UtilityType};

/// Body for creating or replacing a reading
#[derive(Debug, Deserialize)]
pub struct ReadingPayload {
    pub utility: UtilityType,
    pub amount: Decimal,
    /// Defaults to the utility's standard unit
    pub unit: Option<String>,
    pub charge: Option<Decimal>,
    /// Defaults to now
    pub measured_at: Option<DateTime<Utc>>,
}

impl ReadingPayload {
    fn into_new_reading(self) -> Result<NewReading, AppError> {
        if self.amount < Decimal::ZERO {
            return Err(AppError::bad_request("amount must not be negative"));
        }
        if matches!(self.charge, Some(c) if c < Decimal::ZERO) {
            return Err(AppError::bad_request("charge must not be negative"));
        }
        Ok(NewReading {
            unit: self
                .unit
                .unwrap_or_else(|| self.utility.unit().to_string()),
            utility: self.utility,
            amount: self.amount,
            charge: self.charge,
            measured_at: self.measured_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Query parameters for listing readings. `from`/`to` bound `measured_at`
/// as a half-open range and must be given together.
#[derive(Debug, Deserialize)]
pub struct ReadingQuery {
    pub utility: Option<UtilityType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// POST /api/users/:user_id/readings - Ingest a reading (triggers alert rules)
pub async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ReadingPayload>,
) -> Result<(StatusCode, Json<Reading>), AppError> {
    let new_reading = payload.into_new_reading()?;
    let stored = state.engine.ingest_reading(user_id, &new_reading)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/users/:user_id/readings - List readings, newest first
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<ReadingQuery>,
) -> Result<Json<Vec<Reading>>, AppError> {
    let readings = match (params.utility, params.from, params.to) {
        (Some(utility), Some(from), Some(to)) => {
            state.db().find_readings_between(user_id, utility, from, to)?
        }
        (None, Some(from), Some(to)) => state.db().find_readings_by_user(user_id, from, to)?,
        (Some(utility), None, None) => state.db().list_readings_by_type(user_id, utility)?,
        (None, None, None) => state.db().list_readings(user_id)?,
        _ => {
            return Err(AppError::bad_request(
                "from and to must be provided together",
            ))
        }
    };
    Ok(Json(readings))
}

/// Query parameters for the latest reading
#[derive(Debug, Deserialize)]
pub struct LatestReadingQuery {
    pub utility: UtilityType,
}

/// GET /api/users/:user_id/readings/latest - Most recent reading for a utility
pub async fn latest_reading(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<LatestReadingQuery>,
) -> Result<Json<Reading>, AppError> {
    state
        .db()
        .latest_reading(user_id, params.utility)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("No readings for this utility"))
}

/// PUT /api/users/:user_id/readings/:id - Replace a reading's fields
pub async fn update_reading(
    State(state): State<Arc<AppState>>,
    Path((user_id, reading_id)): Path<(i64, i64)>,
    Json(payload): Json<ReadingPayload>,
) -> Result<Json<Reading>, AppError> {
    let new_reading = payload.into_new_reading()?;
    let updated = state
        .db()
        .update_reading(user_id, reading_id, &new_reading)
        .map_err(core_error)?;
    Ok(Json(updated))
}
