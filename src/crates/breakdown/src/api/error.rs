//! API error types and HTTP response conversion
//!
//! Converts lifecycle, admin gate and multipart errors into JSON error bodies
//! with matching HTTP status codes.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{GateError, LifecycleError};

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    /// Create a new API error response
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// Missing or malformed credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Rejected credentials, or a ticket the caller may not touch
    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::InternalError(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!("API Error: {:?}", body);
        } else {
            tracing::debug!("API Error: {:?}", body);
        }

        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotAuthorizedOrNotFound => ApiError::Forbidden(err.to_string()),
            LifecycleError::InvalidCode { .. } | LifecycleError::Validation(_) => {
                ApiError::ValidationError(err.to_string())
            }
            LifecycleError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LifecycleError::Storage(e) => {
                tracing::error!("Breakdown store failure: {}", e);
                ApiError::InternalError("failed to access breakdown store".to_string())
            }
            LifecycleError::Attachment(e) => {
                tracing::error!("Attachment failure: {}", e);
                ApiError::InternalError("failed to store attachment".to_string())
            }
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        if err.is_unauthenticated() {
            ApiError::Unauthorized(err.to_string())
        } else {
            ApiError::Forbidden(err.to_string())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::ticket::Stage;

    #[test]
    fn test_not_authorized_is_forbidden() {
        let err = ApiError::from(LifecycleError::NotAuthorizedOrNotFound);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(err.to_string(), "Not authorized or breakdown not found");
    }

    #[test]
    fn test_invalid_code_is_validation_error() {
        let err = ApiError::from(LifecycleError::InvalidCode {
            stage: Stage::Closure,
            code: "BAD-CODE".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("BAD-CODE"));
    }

    #[test]
    fn test_not_found_error() {
        let err = ApiError::from(LifecycleError::NotFound("BD-1".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "NotFound");
    }

    #[test]
    fn test_storage_failure_is_generic() {
        let err = ApiError::from(LifecycleError::Storage(StoreError::Corrupt {
            id: "BD-1".to_string(),
            reason: "bad timestamp".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("bad timestamp"));
    }

    #[test]
    fn test_gate_errors() {
        let missing = ApiError::from(GateError::MissingCredentials);
        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        let invalid = ApiError::from(GateError::InvalidCredentials);
        assert_eq!(invalid.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest("malformed".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }
}
