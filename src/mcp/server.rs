//! MCP server implementation: request dispatch and the tool registry.
//!
//! This module implements the protocol core of the server:
//!
//! 1. **Parsing**: raw bytes in, JSON-RPC messages out
//! 2. **Lifecycle gating**: `tools/*` methods require the `initialized` notification
//! 3. **Dispatch**: fixed protocol methods plus a registry lookup for tools
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Tools     │    │
//! │   │ (stdio/SSE) │    │  (dispatch) │    │  (handlers) │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is populated before any transport starts and is read-only
//! afterwards, so a shared `Arc<McpServer>` needs no locking around lookups.
//! The `initialized` flag is process-global: on the SSE transport one client's
//! initialization unlocks tool methods for every connected client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::protocol::{
    parse_message, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};

/// A callable tool handler.
///
/// Handlers are invoked synchronously by the protocol core and may block the
/// calling task for the duration of the call. They receive the request's
/// argument map and produce a JSON result or a [`ToolError`].
pub type ToolHandler = Box<dyn Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync>;

/// An immutable tool descriptor, registered once at startup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique tool name, used as the registry lookup key.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema describing the accepted arguments.
    pub input_schema: Value,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a single-item text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

struct RegisteredTool {
    tool: Tool,
    handler: ToolHandler,
}

/// The MCP protocol core.
///
/// Owns the tool registry and the process-wide `initialized` flag. Created
/// once at startup; registration happens before any transport runs, after
/// which the server is shared immutably across connections.
pub struct McpServer {
    tools: HashMap<String, RegisteredTool>,
    initialized: AtomicBool,
}

impl McpServer {
    /// Creates a new server with an empty tool registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Registers a tool and its handler.
    ///
    /// The tool name is the lookup key; registering the same name twice
    /// replaces the earlier entry.
    pub fn register_tool(&mut self, tool: Tool, handler: ToolHandler) {
        tracing::info!(tool = %tool.name, "Registered tool");
        self.tools
            .insert(tool.name.clone(), RegisteredTool { tool, handler });
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the `initialized` notification has been received.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Processes a raw JSON-RPC message and returns the serialised response.
    ///
    /// Returns `None` when no response must be sent (the notification case);
    /// this is distinct from an error response. Every request with a non-null
    /// id receives exactly one response, success or error.
    pub fn handle_request(&self, raw: &str) -> Option<String> {
        let req = match parse_message(raw) {
            Ok(req) => req,
            Err(error) => return Some(encode(&error)),
        };

        if req.is_notification() {
            self.handle_notification(&req);
            return None;
        }

        // The lifecycle notification never gets a response, even when a
        // client attaches an id to it.
        if is_initialized_method(&req.method) {
            self.initialized.store(true, Ordering::SeqCst);
            tracing::info!("Server initialized");
            return None;
        }

        let id = req.id.clone()?;
        let outcome = match req.method.as_str() {
            "initialize" => Ok(Self::handle_initialize(id.clone())),
            "tools/list" => self.handle_tools_list(id.clone()),
            "tools/call" => self.handle_tools_call(id.clone(), req.params.as_ref()),
            "ping" => Ok(JsonRpcResponse::success(id.clone(), json!({"status": "ok"}))),
            method => Err(JsonRpcError::method_not_found(id.clone(), method)),
        };

        match outcome {
            Ok(response) => Some(encode(&response)),
            Err(error) => Some(encode(&error)),
        }
    }

    fn handle_notification(&self, req: &JsonRpcRequest) {
        if is_initialized_method(&req.method) {
            self.initialized.store(true, Ordering::SeqCst);
            tracing::info!("Server initialized");
        } else {
            tracing::debug!(method = %req.method, "Ignoring notification");
        }
    }

    /// Handles the initialize request.
    ///
    /// Always succeeds regardless of the current lifecycle state and does not
    /// flip the `initialized` flag; that is the notification's job.
    fn handle_initialize(id: RequestId) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        JsonRpcResponse::success(id, result)
    }

    /// Handles the tools/list request.
    ///
    /// The registry is returned in iteration order, which is unordered.
    fn handle_tools_list(&self, id: RequestId) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialized(&id)?;

        let tools: Vec<&Tool> = self.tools.values().map(|entry| &entry.tool).collect();

        Ok(JsonRpcResponse::success(id, json!({ "tools": tools })))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<&Value>,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialized(&id)?;

        let params: ToolCallParams = params
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(id.clone(), format!("Invalid tool call params: {e}"))
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(id.clone(), "Missing tool call params")
            })?;

        let entry = self.tools.get(&params.name).ok_or_else(|| {
            JsonRpcError::invalid_params(id.clone(), format!("Tool not found: {}", params.name))
        })?;

        let result = (entry.handler)(&params.arguments).map_err(|e| match e {
            ToolError::InvalidArguments(msg) => {
                JsonRpcError::invalid_params(id.clone(), format!("Invalid params: {msg}"))
            }
            ToolError::Execution(msg) => {
                JsonRpcError::internal_error(id.clone(), format!("Tool execution error: {msg}"))
            }
        })?;

        let text = serde_json::to_string(&result).map_err(|e| {
            tracing::error!(error = %e, tool = %params.name, "Failed to serialise tool result");
            JsonRpcError::internal_error(id.clone(), "Failed to serialise tool result")
        })?;

        let call_result = serde_json::to_value(ToolCallResult::text(text)).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call envelope");
            JsonRpcError::internal_error(id.clone(), "Internal error")
        })?;

        Ok(JsonRpcResponse::success(id, call_result))
    }

    /// Ensures the `initialized` notification has been received.
    fn require_initialized(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(JsonRpcError::not_initialized(id.clone()))
        }
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Both the bare and namespaced spellings of the lifecycle notification are
/// accepted; clients in the wild send either.
fn is_initialized_method(method: &str) -> bool {
    method == "initialized" || method == "notifications/initialized"
}

/// Serialises an outgoing message, falling back to a static internal error
/// payload if serialisation itself fails.
fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialise response");
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server() -> McpServer {
        let mut server = McpServer::new();
        server.register_tool(
            Tool {
                name: "echo_args".to_string(),
                description: "Returns its arguments".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            Box::new(|args| Ok(Value::Object(args.clone()))),
        );
        server.register_tool(
            Tool {
                name: "always_fails".to_string(),
                description: "Fails on every call".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            Box::new(|_| Err(ToolError::Execution("boom".to_string()))),
        );
        server
    }

    fn initialize(server: &McpServer) {
        assert!(server
            .handle_request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .is_some());
        assert!(server
            .handle_request(r#"{"jsonrpc":"2.0","method":"initialized"}"#)
            .is_none());
    }

    fn response_json(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn initialize_reports_protocol_version() {
        let server = test_server();
        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap();
        let resp = response_json(&raw);

        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["capabilities"]["tools"], json!({}));
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn initialize_does_not_set_flag() {
        let server = test_server();
        server
            .handle_request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap();
        assert!(!server.is_initialized());
    }

    #[test]
    fn initialized_notification_returns_none() {
        let server = test_server();
        let out = server.handle_request(r#"{"jsonrpc":"2.0","method":"initialized"}"#);
        assert!(out.is_none());
        assert!(server.is_initialized());
    }

    #[test]
    fn namespaced_initialized_accepted() {
        let server = test_server();
        let out =
            server.handle_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(out.is_none());
        assert!(server.is_initialized());
    }

    #[test]
    fn tools_list_gated_before_initialized() {
        let server = test_server();
        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32002);
        assert_eq!(resp["error"]["message"], "Server not initialized");
    }

    #[test]
    fn tools_call_gated_before_initialized() {
        let server = test_server();
        let raw = server
            .handle_request(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo_args"}}"#,
            )
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32002);
    }

    #[test]
    fn tools_list_returns_registry() {
        let server = test_server();
        initialize(&server);

        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
            .unwrap();
        let resp = response_json(&raw);
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
    }

    #[test]
    fn tools_call_wraps_result_as_text_content() {
        let server = test_server();
        initialize(&server);

        let raw = server
            .handle_request(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"echo_args","arguments":{"k":"v"}}}"#,
            )
            .unwrap();
        let resp = response_json(&raw);
        let content = &resp["result"]["content"][0];
        assert_eq!(content["type"], "text");

        let embedded: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(embedded["k"], "v");
    }

    #[test]
    fn tools_call_unknown_tool() {
        let server = test_server();
        initialize(&server);

        let raw = server
            .handle_request(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"missing"}}"#,
            )
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32602);
        assert!(resp["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing"));
    }

    #[test]
    fn tools_call_execution_error() {
        let server = test_server();
        initialize(&server);

        let raw = server
            .handle_request(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"always_fails"}}"#,
            )
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32603);
        assert_eq!(resp["error"]["message"], "Tool execution error: boom");
    }

    #[test]
    fn tools_call_missing_params() {
        let server = test_server();
        initialize(&server);

        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call"}"#)
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[test]
    fn ping_works_without_initialization() {
        let server = test_server();
        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#)
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["result"]["status"], "ok");
    }

    #[test]
    fn unknown_method() {
        let server = test_server();
        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":9,"method":"foo/bar"}"#)
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32601);
        assert_eq!(resp["error"]["message"], "Method not found: foo/bar");
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let server = test_server();
        let raw = server.handle_request("{nope").unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["error"]["code"], -32700);
        assert!(resp["id"].is_null());
    }

    #[test]
    fn unknown_notification_is_silent() {
        let server = test_server();
        assert!(server
            .handle_request(r#"{"jsonrpc":"2.0","method":"something/else"}"#)
            .is_none());
        assert!(!server.is_initialized());
    }

    #[test]
    fn responses_echo_request_id() {
        let server = test_server();
        let raw = server
            .handle_request(r#"{"jsonrpc":"2.0","id":"req-1","method":"ping"}"#)
            .unwrap();
        let resp = response_json(&raw);
        assert_eq!(resp["id"], "req-1");
    }
}
