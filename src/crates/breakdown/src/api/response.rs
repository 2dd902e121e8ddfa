//! API response helpers

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Generic success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    /// Create a new success response
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Create a 200 OK JSON response
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(SuccessResponse::new(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_shape() {
        let json = serde_json::to_value(SuccessResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][1], 2);
    }
}
