//! CORS middleware configuration
//!
//! An empty origin list allows any origin. Otherwise only the listed origins
//! may call the API.

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Create a permissive CORS layer (any origin)
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Create a CORS layer restricted to `allowed_origins`
pub fn cors_layer_restricted(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Pick the CORS layer for a configured origin list
pub fn cors_for(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        cors_layer()
    } else {
        cors_layer_restricted(allowed_origins)
    }
}
