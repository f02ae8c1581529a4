// VerifyWise MCP server - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod mcp;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod routes;
pub mod transport;

pub use error::ApiError;
pub use http_client::ApiClient;
pub use registry::{get_client, ClientRegistry};
