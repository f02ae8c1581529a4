use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::mcp::McpServer;

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// MCP JSON-RPC endpoint
pub fn mcp_routes(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .with_state(state)
}

/// Full HTTP application: health, MCP, CORS and request tracing
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(mcp_routes(state))
        .layer(crate::middleware::cors_layer())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "VerifyWise MCP server is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// POST /mcp - Handle one JSON-RPC message
///
/// The body is taken as text so malformed JSON still gets a JSON-RPC
/// parse error instead of an axum rejection. Notifications are
/// acknowledged with 202 and an empty body.
async fn mcp_handler(State(state): State<AppState>, body: String) -> Response {
    match state.server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
