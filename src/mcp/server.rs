// MCP request dispatch and the stdio transport

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use super::tools::ToolRegistry;

pub const SERVER_NAME: &str = "verifywise-mcp";

const INSTRUCTIONS: &str = "VerifyWise is an AI governance platform. Use these tools to manage \
AI governance projects (Use Cases) and the risks tracked against them: list and inspect \
projects, register new AI systems with their risk classification, and create, update or \
close project risks with a severity of low, medium, high or critical.";

/// Dispatches JSON-RPC messages to the registered tools
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one raw JSON-RPC message. Notifications produce no response.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(_) => return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request())),
        };

        self.handle_request(request).await
    }

    /// Handle a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request(),
            ));
        }

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.unwrap_or(Value::Null);
        tracing::debug!(method = %request.method, "Handling request");

        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(format!("invalid initialize params: {}", e)))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, version = %client.version, "MCP client connected");
        }

        let result = InitializeResult {
            protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                .to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        to_value(result)
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_value(ListToolsResult {
            tools: self.tools.list_schemas(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::invalid_params(format!("invalid tools/call params: {}", e))
                })
            })?;

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let result = match tool.execute(params.arguments).await {
            Ok(value) => CallToolResult::text(render_result(&value)),
            Err(e) => {
                tracing::error!(tool = %params.name, error = %e, "Tool call failed");
                CallToolResult::error(e.user_message())
            }
        };
        to_value(result)
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    ///
    /// Each message is handled on its own task, so a slow tool call does not
    /// hold up later requests. Responses are written in completion order.
    /// Returns once every in-flight request has been answered.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let mut lines = reader.lines();
        let mut reading = true;
        let mut tx = Some(tx);

        loop {
            tokio::select! {
                line = lines.next_line(), if reading => {
                    match line? {
                        Some(line) => {
                            let line = line.trim().to_string();
                            if line.is_empty() {
                                continue;
                            }
                            if let Some(tx) = &tx {
                                let server = Arc::clone(&self);
                                let tx = tx.clone();
                                tokio::spawn(async move {
                                    if let Some(response) = server.handle_message(&line).await {
                                        let _ = tx.send(response);
                                    }
                                });
                            }
                        }
                        None => {
                            tracing::info!("stdin closed, finishing in-flight requests");
                            reading = false;
                            // Channel closes once the last handler drops its sender
                            tx = None;
                        }
                    }
                }
                response = rx.recv() => {
                    match response {
                        Some(response) => write_response(&mut writer, &response).await?,
                        None => break,
                    }
                }
            }
        }

        tracing::info!("stdio transport stopped");
        Ok(())
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = serde_json::to_vec(response).map_err(std::io::Error::other)?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    writer.flush().await
}

/// Text content for a tool result: strings verbatim, everything else pretty JSON
fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {}", e),
        data: None,
    })
}
