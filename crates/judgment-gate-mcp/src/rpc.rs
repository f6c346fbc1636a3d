// judgment-gate-mcp/src/rpc.rs
// ============================================================================
// Module: JSON-RPC Envelope
// Description: JSON-RPC 2.0 message types and the shared envelope check.
// Purpose: Decode requests identically for both transports before dispatch.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One JSON-RPC 2.0 message per line (stdio) or per body (HTTP). Requests
//! carry an `id` echoed back verbatim; notifications carry none and never
//! produce output. The envelope check (parse + exact `"2.0"` version) runs
//! before the dispatcher on both transports so malformed traffic is rejected
//! consistently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only accepted JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";
/// Parse error: the body was not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Invalid request: wrong or missing envelope version.
pub const INVALID_REQUEST: i64 = -32600;
/// Method (or tool) not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Handler raised an error.
pub const HANDLER_ERROR: i64 = -32000;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC protocol version; must be exactly `"2.0"`.
    pub jsonrpc: String,
    /// Opaque request identifier; absent for notifications. Echoed verbatim,
    /// never interpreted.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Returns true when the message is a notification (no usable id).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }

    /// Returns the id to echo on a response, or `Null` for notifications.
    #[must_use]
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Outgoing JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier echoed verbatim.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// Builds a success response echoing the given id.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response echoing the given id.
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Envelope Check
// ============================================================================

/// Rejected envelope: the error to report and whether the message looked like
/// a notification (no id), in which case stdio suppresses the output.
#[derive(Debug, Clone)]
pub struct EnvelopeFault {
    /// Error envelope describing the rejection.
    pub response: RpcResponse,
    /// True when the body parsed as JSON but carried no id.
    pub notification_shaped: bool,
}

/// Decodes one message, enforcing the envelope before dispatch.
///
/// # Errors
///
/// Returns [`EnvelopeFault`] with a parse-error envelope for malformed JSON
/// and an invalid-request envelope for a wrong or missing version.
pub fn decode_message(bytes: &[u8]) -> Result<RpcRequest, EnvelopeFault> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| EnvelopeFault {
        response: RpcResponse::error(Value::Null, PARSE_ERROR, "parse error"),
        notification_shaped: false,
    })?;
    let id = value.get("id").cloned();
    let notification_shaped = matches!(id, None | Some(Value::Null));
    let version_ok =
        value.get("jsonrpc").and_then(Value::as_str).is_some_and(|v| v == JSONRPC_VERSION);
    if !version_ok {
        return Err(EnvelopeFault {
            response: RpcResponse::error(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid request: jsonrpc must be \"2.0\"",
            ),
            notification_shaped,
        });
    }
    serde_json::from_value::<RpcRequest>(value).map_err(|_| EnvelopeFault {
        response: RpcResponse::error(
            id.unwrap_or(Value::Null),
            INVALID_REQUEST,
            "invalid request: missing method",
        ),
        notification_shaped,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
