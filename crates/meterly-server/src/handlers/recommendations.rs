//! Recommendation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{core_error, AppError, AppState};
use meterly_core::Recommendation;

/// Query parameters for listing recommendations
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub unapplied_only: bool,
}

/// GET /api/users/:user_id/recommendations - List recommendations
pub async fn list_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<RecommendationQuery>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let recs = if params.unapplied_only {
        state.db().list_unapplied_recommendations(user_id)?
    } else {
        state.db().list_recommendations(user_id)?
    };
    Ok(Json(recs))
}

/// POST /api/users/:user_id/recommendations/regenerate - Full-replace cycle
///
/// Asks the advisor per utility, falls back to the rule engine, deletes the
/// user's unapplied recommendations, and inserts the fresh batch.
pub async fn regenerate_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let recs = state.engine.regenerate_recommendations(user_id).await?;
    Ok(Json(recs))
}

/// POST /api/users/:user_id/recommendations/:id/apply - Mark as applied
pub async fn apply_recommendation(
    State(state): State<Arc<AppState>>,
    Path((user_id, recommendation_id)): Path<(i64, i64)>,
) -> Result<Json<Recommendation>, AppError> {
    let rec = state
        .db()
        .mark_recommendation_applied(user_id, recommendation_id)
        .map_err(core_error)?;
    Ok(Json(rec))
}
