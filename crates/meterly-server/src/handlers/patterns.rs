//! Usage pattern handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use meterly_core::{Frequency, UsagePattern, UtilityType};

/// Query parameters for listing patterns
#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    pub utility: Option<UtilityType>,
}

/// GET /api/users/:user_id/patterns - List computed patterns
pub async fn list_patterns(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<PatternQuery>,
) -> Result<Json<Vec<UsagePattern>>, AppError> {
    let patterns = match params.utility {
        Some(utility) => state.db().list_patterns_by_type(user_id, utility)?,
        None => state.db().list_patterns(user_id)?,
    };
    Ok(Json(patterns))
}

/// Query parameters for analysis. Both must be given together; with neither,
/// every (utility, frequency) pair is recomputed.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub utility: Option<UtilityType>,
    pub frequency: Option<Frequency>,
}

/// POST /api/users/:user_id/patterns/analyze - Recompute patterns
pub async fn analyze_patterns(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<AnalyzeQuery>,
) -> Result<Json<Vec<UsagePattern>>, AppError> {
    match (params.utility, params.frequency) {
        (Some(utility), Some(frequency)) => {
            let pattern = state
                .engine
                .analyze_utility(user_id, utility, frequency)?
                .ok_or_else(|| AppError::not_found("No readings in the analysis window"))?;
            Ok(Json(vec![pattern]))
        }
        (None, None) => Ok(Json(state.engine.analyze_all_utilities(user_id)?)),
        _ => Err(AppError::bad_request(
            "utility and frequency must be provided together",
        )),
    }
}
