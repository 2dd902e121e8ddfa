//! Health check endpoint handler

use axum::{extract::State, http::StatusCode, Json};

use crate::api::{models::HealthResponse, routes::AppState};

/// Handler for GET /health
///
/// Reports liveness together with database connectivity.
pub async fn health(State(app_state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match app_state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ok", "connected"))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("error", "error")),
            )
        }
    }
}
