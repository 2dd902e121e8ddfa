//! REST API layer for breakdown tickets
//!
//! Provides HTTP endpoints for:
//! - Opening breakdowns and advancing them through their stages
//! - Reading breakdowns and their media
//! - Admin listing, editing and deletion

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use response::SuccessResponse;
pub use routes::{create_router, AppState, RouterOptions};
