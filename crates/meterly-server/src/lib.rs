//! Meterly Web Server
//!
//! Axum-based REST API over the analytics engine. Routes are user-scoped
//! under `/api/users/:user_id`; authentication is handled by the deployment
//! (reverse proxy), not this service.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use meterly_core::{AdvisorBackend, AdvisorClient, AnalyticsEngine, Database};

mod handlers;
mod scheduler;

pub use scheduler::{start_month_close_scheduler, MonthCloseConfig};

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub engine: AnalyticsEngine,
}

impl AppState {
    pub fn db(&self) -> &Database {
        self.engine.db()
    }
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let advisor = AdvisorClient::from_env();
    match &advisor {
        Some(client) => {
            info!(
                "Advisor configured: {} (model: {})",
                client.host(),
                client.model()
            );
        }
        None => {
            info!("Advisor not configured (set OLLAMA_HOST to enable AI recommendations)");
        }
    }

    create_router_with_engine(AnalyticsEngine::new(db, advisor), config)
}

/// Create the router around an existing engine (for testing)
pub fn create_router_with_engine(engine: AnalyticsEngine, config: ServerConfig) -> Router {
    let state = Arc::new(AppState { engine });

    let user_routes = Router::new()
        // Readings
        .route(
            "/readings",
            get(handlers::list_readings).post(handlers::ingest_reading),
        )
        .route("/readings/latest", get(handlers::latest_reading))
        .route("/readings/:id", put(handlers::update_reading))
        // Patterns
        .route("/patterns", get(handlers::list_patterns))
        .route("/patterns/analyze", post(handlers::analyze_patterns))
        // Alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/read-all", post(handlers::mark_all_alerts_read))
        .route("/alerts/:id/read", post(handlers::mark_alert_read))
        // Recommendations
        .route("/recommendations", get(handlers::list_recommendations))
        .route(
            "/recommendations/regenerate",
            post(handlers::regenerate_recommendations),
        )
        .route(
            "/recommendations/:id/apply",
            post(handlers::apply_recommendation),
        )
        // Savings tracking
        .route(
            "/savings",
            get(handlers::list_savings_trackings).post(handlers::start_savings_tracking),
        )
        .route("/savings/total", get(handlers::total_savings))
        .route(
            "/savings/:id/refresh",
            post(handlers::refresh_savings_tracking),
        )
        // Budget
        .route(
            "/budget",
            get(handlers::get_budget).put(handlers::upsert_budget),
        );

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .nest("/users/:user_id", user_routes);

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    check_advisor_connection().await;

    let engine = AnalyticsEngine::new(db, AdvisorClient::from_env());

    // Start the month-close scheduler if configured
    if let Some(schedule) = MonthCloseConfig::from_env() {
        start_month_close_scheduler(engine.clone(), schedule);
    }

    let app = create_router_with_engine(engine, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log advisor connection status
async fn check_advisor_connection() {
    match AdvisorClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "Advisor connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "Advisor configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("Advisor not configured (set OLLAMA_HOST to enable AI recommendations)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

/// Map a core error onto an HTTP status. NotFound surfaces as 404 with its
/// message; everything else becomes a sanitized 500.
pub(crate) fn core_error(err: meterly_core::Error) -> AppError {
    match err {
        meterly_core::Error::NotFound(msg) => AppError::not_found(&msg),
        other => other.into(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
