// judgment-gate-mcp/src/dispatcher.rs
// ============================================================================
// Module: Request Dispatcher
// Description: Transport-agnostic JSON-RPC method table.
// Purpose: Interpret one decoded message and produce at most one response.
// Dependencies: judgment-gate-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! The dispatcher is stateless per call: it takes one decoded message and
//! returns either a response or `None` for notifications. The method table
//! is exhaustive; unknown methods yield method-not-found rather than being
//! silently ignored. `tools/call` is the only method routed through the
//! guarded pipeline, and a failing handler becomes an error response, never
//! a crash of the serve loop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use judgment_gate_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Notify;

use crate::audit::GateAuditSink;
use crate::audit::RpcAuditEvent;
use crate::audit::now_unix_millis;
use crate::pipeline::GuardedExecutor;
use crate::registry::ToolError;
use crate::rpc::HANDLER_ERROR;
use crate::rpc::METHOD_NOT_FOUND;
use crate::rpc::RpcRequest;
use crate::rpc::RpcResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed protocol version advertised during initialization.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Invalid tool-call parameters.
const INVALID_PARAMS: i64 = -32602;

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Server identity advertised during initialization.
#[derive(Debug, Clone, Serialize)]
pub struct ServerIdentity {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

/// `initialize` result payload.
#[derive(Debug, Serialize)]
struct InitializeResult {
    /// Fixed protocol version string.
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    /// Server identity.
    #[serde(rename = "serverInfo")]
    server_info: ServerIdentity,
    /// Capability flags.
    capabilities: Value,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// `tools/call` result payload: one text content block of JSON.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content blocks.
    content: Vec<ToolContent>,
}

/// Tool output content block.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON-encoded tool result as text.
    Text {
        /// JSON-encoded payload.
        text: String,
    },
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Transport-agnostic request dispatcher.
pub struct Dispatcher {
    /// Server identity advertised during initialization.
    identity: ServerIdentity,
    /// Guarded tool executor.
    executor: Arc<GuardedExecutor>,
    /// Shutdown signal shared with the transports.
    shutdown: Arc<Notify>,
    /// Audit sink for request diagnostics.
    audit: Arc<dyn GateAuditSink>,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    #[must_use]
    pub fn new(
        identity: ServerIdentity,
        executor: Arc<GuardedExecutor>,
        shutdown: Arc<Notify>,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            identity,
            executor,
            shutdown,
            audit,
        }
    }

    /// Returns the guarded executor backing `tools/call`.
    #[must_use]
    pub fn executor(&self) -> &GuardedExecutor {
        &self.executor
    }

    /// Returns the shutdown signal shared with the transports.
    #[must_use]
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Dispatches one decoded message.
    ///
    /// Returns `None` for notifications: no output is ever produced for a
    /// message without an id, on either transport.
    pub async fn dispatch(&self, request: RpcRequest) -> Option<RpcResponse> {
        let is_notification = request.is_notification();
        let id = request.response_id();
        let response = match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id, request.params.as_ref())),
            "initialized" | "notifications/initialized" => None,
            "tools/list" => Some(RpcResponse::success(
                id,
                json!({"tools": self.executor.catalog().definitions()}),
            )),
            "tools/call" => Some(self.handle_tool_call(id, request.params).await),
            "resources/list" => Some(RpcResponse::success(id, json!({"resources": []}))),
            "prompts/list" => Some(RpcResponse::success(id, json!({"prompts": []}))),
            "ping" => Some(RpcResponse::success(
                id,
                json!({"pong": true, "timestamp": now_unix_millis()}),
            )),
            "shutdown" => {
                let response = RpcResponse::success(id, json!({"ok": true}));
                self.shutdown.notify_one();
                Some(response)
            }
            other => {
                self.audit.rpc(RpcAuditEvent {
                    event: "method_not_found",
                    timestamp_ms: now_unix_millis(),
                    method: other.to_string(),
                    request_id: None,
                    error_code: Some(METHOD_NOT_FOUND),
                    detail: None,
                });
                Some(RpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                ))
            }
        };
        if is_notification {
            return None;
        }
        response
    }

    /// Handles `initialize`, logging the client identity when provided.
    fn handle_initialize(&self, id: Value, params: Option<&Value>) -> RpcResponse {
        if let Some(client) = params
            .and_then(|params| params.get("clientInfo"))
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
        {
            self.audit.rpc(RpcAuditEvent {
                event: "client_initialized",
                timestamp_ms: now_unix_millis(),
                method: "initialize".to_string(),
                request_id: None,
                error_code: None,
                detail: Some(client.to_string()),
            });
        }
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            server_info: self.identity.clone(),
            capabilities: json!({"tools": {"listChanged": false}}),
        };
        let payload = serde_json::to_value(result).unwrap_or(Value::Null);
        RpcResponse::success(id, payload)
    }

    /// Handles `tools/call` through the guarded pipeline.
    async fn handle_tool_call(&self, id: Value, params: Option<Value>) -> RpcResponse {
        let params = params.unwrap_or(Value::Null);
        let call: ToolCallParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(err) => {
                return RpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("invalid tool params: {err}"),
                );
            }
        };
        let now = Timestamp::from_unix_millis(now_unix_millis());
        match self.executor.execute(&call.name, call.arguments, now).await {
            Ok(output) => {
                let Ok(text) = serde_json::to_string(&output) else {
                    return tool_error_response(id, &ToolError::Serialization);
                };
                let result = ToolCallResult {
                    content: vec![ToolContent::Text {
                        text,
                    }],
                };
                match serde_json::to_value(result) {
                    Ok(value) => RpcResponse::success(id, value),
                    Err(_) => tool_error_response(id, &ToolError::Serialization),
                }
            }
            Err(err) => tool_error_response(id, &err),
        }
    }
}

/// Maps a tool error onto its JSON-RPC error response.
fn tool_error_response(id: Value, error: &ToolError) -> RpcResponse {
    let code = match error {
        ToolError::UnknownTool => METHOD_NOT_FOUND,
        ToolError::InvalidParams(_) => INVALID_PARAMS,
        ToolError::GuardBlocked {
            ..
        }
        | ToolError::Handler(_)
        | ToolError::Ledger(_)
        | ToolError::Serialization => HANDLER_ERROR,
    };
    RpcResponse::error(id, code, error.to_string())
}
