//! Cross-origin policy for browser clients.

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

/// Build the CORS layer for `allowed_origins`.
///
/// An empty list is permissive. Otherwise only the listed origins are
/// allowed, with credentials; methods and headers mirror the preflight
/// request since wildcards cannot be combined with credentials.
/// A `"*"` entry allows any origin without credentials.
/// Unparseable origins are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        if allowed_origins.len() > 1 {
            warn!("wildcard origin present, ignoring the other listed origins");
        }
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
