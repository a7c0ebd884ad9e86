//! Alert handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{core_error, AppError, AppState};
use meterly_core::{Alert, AlertKind, UtilityType};

use super::SuccessResponse;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub utility: Option<UtilityType>,
    pub kind: Option<AlertKind>,
}

/// GET /api/users/:user_id/alerts - List alerts, newest first
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = if let Some(kind) = params.kind {
        state.db().list_alerts_by_kind(user_id, kind)?
    } else if let Some(utility) = params.utility {
        state.db().list_alerts_by_utility(user_id, utility)?
    } else if params.unread_only {
        state.db().list_unread_alerts(user_id)?
    } else {
        state.db().list_alerts(user_id)?
    };
    Ok(Json(alerts))
}

/// POST /api/users/:user_id/alerts/:id/read - Mark one alert as read
pub async fn mark_alert_read(
    State(state): State<Arc<AppState>>,
    Path((_user_id, alert_id)): Path<(i64, i64)>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db().mark_alert_read(alert_id).map_err(core_error)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/users/:user_id/alerts/read-all - Mark all alerts as read
pub async fn mark_all_alerts_read(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = state.db().mark_all_alerts_read(user_id)?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}
