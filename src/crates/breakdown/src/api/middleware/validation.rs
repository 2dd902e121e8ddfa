//! Request validation helpers

use crate::api::error::{ApiError, ApiResult};

/// Validate that a required string field is not empty
pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{} cannot be empty", field_name)));
    }
    Ok(())
}

/// Parse a boolean form field
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off` in any case.
pub fn parse_flag(value: &str, field_name: &str) -> ApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ApiError::ValidationError(format!(
            "{} must be true or false",
            field_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("U1", "userId").is_ok());
        assert!(validate_not_empty("", "userId").is_err());
        assert!(validate_not_empty("   ", "userId").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true", "productionStopped").unwrap());
        assert!(parse_flag("Yes", "productionStopped").unwrap());
        assert!(!parse_flag("false", "productionStopped").unwrap());
        assert!(!parse_flag("", "productionStopped").unwrap());
        assert!(parse_flag("maybe", "productionStopped").is_err());
    }
}
