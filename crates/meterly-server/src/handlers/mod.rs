//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod alerts;
pub mod budgets;
pub mod patterns;
pub mod readings;
pub mod recommendations;
pub mod savings;

// Re-export all handlers for use in router
pub use alerts::*;
pub use budgets::*;
pub use patterns::*;
pub use readings::*;
pub use recommendations::*;
pub use savings::*;

use axum::Json;
use serde::Serialize;

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/health - Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
