//! API middleware layer
//!
//! Provides middleware for request processing including CORS, logging, and validation.

pub mod cors;
pub mod logging;
pub mod validation;

pub use cors::{cors_for, cors_layer};
pub use logging::logging_layer;
pub use validation::{parse_flag, validate_not_empty};
