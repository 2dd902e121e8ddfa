//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{self, admin};
use crate::api::middleware::{cors_for, logging_layer};
use crate::db::DatabaseConnection;
use crate::services::{AdminGate, LifecycleEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub engine: LifecycleEngine,
    pub gate: Arc<AdminGate>,
}

/// Router-level settings taken from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Maximum request body size
    pub max_body_bytes: usize,
    /// Allowed CORS origins. Empty means permissive.
    pub allowed_origins: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: 20 * 1024 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

/// Build the complete API router
pub fn create_router(state: AppState, options: &RouterOptions) -> Router {
    let media_route = format!(
        "{}/:filename",
        state.engine.attachments().public_prefix()
    );

    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health))
        // Stage operations
        .route("/api/breakdowns/open", post(handlers::open_breakdown))
        .route(
            "/api/breakdowns/:id/temporary",
            put(handlers::advance_temporary),
        )
        .route(
            "/api/breakdowns/:id/closure",
            put(handlers::advance_closure),
        )
        .route(
            "/api/breakdowns/:id/approval",
            put(handlers::advance_approval),
        )
        // Reads. The owner listing shares the `:id` segment name with the
        // stage routes.
        .route("/api/breakdowns/:id", get(handlers::list_for_owner))
        .route("/api/breakdowns/single/:id", get(handlers::get_breakdown))
        // Media
        .route("/api/files/:filename", get(handlers::fetch_file))
        .route(&media_route, get(handlers::fetch_file))
        // Admin endpoints
        .route("/api/admin/breakdowns", get(admin::list_all))
        .route(
            "/api/admin/breakdowns/:id",
            get(admin::get_any)
                .put(admin::full_edit)
                .delete(admin::full_delete),
        )
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(cors_for(&options.allowed_origins))
        .layer(logging_layer())
        .with_state(state)
}
