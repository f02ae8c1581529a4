// MCP (Model Context Protocol) server exposing VerifyWise as tools

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{McpServer, SERVER_NAME};
pub use tools::{default_registry, Tool, ToolRegistry};
