// MCP tool definitions and registry

pub mod projects;
pub mod risks;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::protocol::{ToolAnnotations, ToolSchema};
use crate::error::ApiError;
use crate::registry::ClientRegistry;

/// A callable MCP tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the tool arguments
    fn input_schema(&self) -> Value;

    /// True for tools that never modify upstream state
    fn read_only(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: Value) -> Result<Value, ApiError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(self.read_only()),
                destructive_hint: None,
            }),
        }
    }
}

/// Tool registry keyed by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool schemas in name order
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Registry with every VerifyWise tool, sharing one client registry
pub fn default_registry(clients: Arc<ClientRegistry>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    projects::register(&mut registry, clients.clone());
    risks::register(&mut registry, clients);
    registry
}

/// Deserialize tool arguments; `null` counts as an empty object
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ApiError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ApiError::Validation(format!("invalid arguments: {}", e)))
}

/// Build an API path from a collection prefix and one identifier segment.
/// The identifier is percent-encoded so it cannot escape its segment.
pub fn resource_path(prefix: &str, id: &str) -> Result<String, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation("id must not be empty".to_string()));
    }
    if id == "." || id == ".." {
        return Err(ApiError::Validation(format!("invalid id: {}", id)));
    }

    let mut url = reqwest::Url::parse("http://localhost")
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("URL cannot be a base")))?
        .extend(prefix.trim_matches('/').split('/'))
        .push(id);

    Ok(url.path().to_string())
}

/// Insert `value` under `key` when present
pub fn insert_opt(payload: &mut serde_json::Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), Value::String(value));
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str, minimum: i64, maximum: i64, default: i64) -> Value {
    json!({
        "type": "integer",
        "description": description,
        "minimum": minimum,
        "maximum": maximum,
        "default": default
    })
}
