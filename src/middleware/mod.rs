// CORS middleware for the HTTP transport

use tower_http::cors::{Any, CorsLayer};

/// Create CORS middleware layer
///
/// Allows all origins, methods, and headers so browser-based MCP
/// clients can reach `/mcp`. Handles OPTIONS preflight requests.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
