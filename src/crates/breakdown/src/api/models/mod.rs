//! API request and response models

pub mod breakdown;

pub use breakdown::{
    AdvanceApprovalRequest, AdvanceTemporaryRequest, DeletedResponse, OpenedResponse,
    SingleBreakdownResponse,
};

/// Health check response
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,

    /// Database connection status
    pub database: String,

    /// API version
    pub version: String,

    /// Current timestamp
    pub timestamp: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn new(status: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            database: database.into(),
            version: crate::version::VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response() {
        let health = HealthResponse::new("ok", "connected");
        assert_eq!(health.status, "ok");
        assert_eq!(health.database, "connected");
        assert!(!health.version.is_empty());
    }
}
