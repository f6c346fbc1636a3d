// judgment-gate-mcp/tests/dispatcher.rs
// ============================================================================
// Module: Dispatcher Tests
// Description: Tests for the JSON-RPC method table and response semantics.
// ============================================================================
//! ## Overview
//! Validates id echo, notification silence, the exhaustive method table,
//! error codes, and the tools/call content envelope.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use judgment_gate_core::Chain;
use judgment_gate_core::ChainConfig;
use judgment_gate_core::InMemoryLedgerStore;
use judgment_gate_core::NoopGuardian;
use judgment_gate_core::NoopObserver;
use judgment_gate_core::SharedLedgerStore;
use judgment_gate_mcp::CollaboratorKey;
use judgment_gate_mcp::Collaborators;
use judgment_gate_mcp::Dispatcher;
use judgment_gate_mcp::GuardedExecutor;
use judgment_gate_mcp::GuardedExecutorConfig;
use judgment_gate_mcp::LedgerToolFactory;
use judgment_gate_mcp::NoopAuditSink;
use judgment_gate_mcp::PROTOCOL_VERSION;
use judgment_gate_mcp::RpcRequest;
use judgment_gate_mcp::RpcResponse;
use judgment_gate_mcp::ServerIdentity;
use judgment_gate_mcp::ToolError;
use judgment_gate_mcp::ToolFactory;
use judgment_gate_mcp::ToolHandler;
use judgment_gate_mcp::ToolRegistry;
use judgment_gate_mcp::ToolSpec;
use judgment_gate_mcp::registry::ToolBuildError;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Notify;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Handler echoing its arguments.
struct EchoHandler;

#[async_trait::async_trait]
impl ToolHandler for EchoHandler {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({"echoed": arguments}))
    }
}

/// Handler that always fails.
struct FailingHandler;

#[async_trait::async_trait]
impl ToolHandler for FailingHandler {
    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::Handler("handler exploded".to_string()))
    }
}

/// Factory exposing the echo and fail tools.
struct FixtureFactory;

impl ToolFactory for FixtureFactory {
    fn name(&self) -> &str {
        "fixture"
    }

    fn domain(&self) -> &str {
        "test"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        BTreeSet::new()
    }

    fn create(&self, _collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        let schema = json!({"type": "object"});
        Ok(vec![
            ToolSpec {
                name: "echo".to_string(),
                description: "echo".to_string(),
                input_schema: schema.clone(),
                handler: Arc::new(EchoHandler),
            },
            ToolSpec {
                name: "fail".to_string(),
                description: "fail".to_string(),
                input_schema: schema,
                handler: Arc::new(FailingHandler),
            },
        ])
    }
}

/// Builds a dispatcher over the fixture tools and the ledger factory.
fn build_dispatcher() -> (Dispatcher, Arc<Notify>) {
    let audit = Arc::new(NoopAuditSink);
    let chain = Arc::new(Chain::new(
        SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
        ChainConfig::default(),
    ));
    chain.initialize().unwrap();
    let mut registry = ToolRegistry::new(audit.clone());
    registry.register(Arc::new(FixtureFactory)).unwrap();
    registry.register(Arc::new(LedgerToolFactory)).unwrap();
    let collaborators = Collaborators {
        ledger: Some(chain.clone()),
        judge: None,
        archive: None,
    };
    let catalog = Arc::new(registry.create_all(&collaborators));
    let executor = Arc::new(GuardedExecutor::new(GuardedExecutorConfig {
        catalog,
        guardian: Arc::new(NoopGuardian),
        observer: Arc::new(NoopObserver),
        ledger: Some(chain),
        audit: audit.clone(),
        guard_enabled: true,
    }));
    let shutdown = Arc::new(Notify::new());
    let identity = ServerIdentity {
        name: "judgment-gate".to_string(),
        version: "0.1.0".to_string(),
    };
    let dispatcher = Dispatcher::new(identity, executor, Arc::clone(&shutdown), audit);
    (dispatcher, shutdown)
}

/// Builds one request message.
fn request(id: Value, method: &str, params: Option<Value>) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(id),
        method: method.to_string(),
        params,
    }
}

/// Builds one notification message.
fn notification(method: &str) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: None,
        method: method.to_string(),
        params: None,
    }
}

/// Unwraps a response, asserting one exists.
async fn dispatch(dispatcher: &Dispatcher, message: RpcRequest) -> RpcResponse {
    dispatcher.dispatch(message).await.expect("expected a response")
}

// ============================================================================
// SECTION: Envelope Semantics
// ============================================================================

/// Tests the response id always equals the request id, verbatim.
#[tokio::test]
async fn test_response_echoes_request_id() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(&dispatcher, request(json!("opaque-77"), "ping", None)).await;
    assert_eq!(response.id, json!("opaque-77"));
    let response = dispatch(&dispatcher, request(json!(42), "ping", None)).await;
    assert_eq!(response.id, json!(42));
}

/// Tests notifications never produce a response.
#[tokio::test]
async fn test_notifications_are_silent() {
    let (dispatcher, _shutdown) = build_dispatcher();
    assert!(dispatcher.dispatch(notification("initialized")).await.is_none());
    assert!(dispatcher.dispatch(notification("notifications/initialized")).await.is_none());
    // Even an unknown method stays silent without an id.
    assert!(dispatcher.dispatch(notification("no/such/method")).await.is_none());
}

/// Tests unknown methods yield method-not-found, never silence.
#[tokio::test]
async fn test_unknown_method_yields_not_found() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(&dispatcher, request(json!(1), "no/such/method", None)).await;
    assert_eq!(response.error.unwrap().code, -32601);
}

// ============================================================================
// SECTION: Method Table
// ============================================================================

/// Tests initialize returns identity, protocol version, and capabilities.
#[tokio::test]
async fn test_initialize_reports_identity() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(
        &dispatcher,
        request(json!(1), "initialize", Some(json!({"clientInfo": {"name": "test-client"}}))),
    )
    .await;
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], json!(PROTOCOL_VERSION));
    assert_eq!(result["serverInfo"]["name"], json!("judgment-gate"));
    assert!(result["capabilities"]["tools"].is_object());
}

/// Tests tools/list returns the full catalog with schemas.
#[tokio::test]
async fn test_tools_list_returns_catalog() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(&dispatcher, request(json!(2), "tools/list", None)).await;
    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    // Two fixture tools plus the eleven ledger tools.
    assert_eq!(tools.len(), 13);
    let names: Vec<&str> = tools.iter().filter_map(|tool| tool["name"].as_str()).collect();
    assert!(names.contains(&"echo"));
    assert!(names.contains(&"ledger_status"));
    assert!(tools.iter().all(|tool| tool["inputSchema"].is_object()));
}

/// Tests tools/call wraps the result as one text content block of JSON.
#[tokio::test]
async fn test_tools_call_wraps_result_as_text_content() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(
        &dispatcher,
        request(
            json!(3),
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"k": "v"}})),
        ),
    )
    .await;
    let result = response.result.unwrap();
    let content = result["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], json!("text"));
    let decoded: Value = serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, json!({"echoed": {"k": "v"}}));
}

/// Tests a tool name missing from the registry yields not-found.
#[tokio::test]
async fn test_unknown_tool_yields_not_found() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(
        &dispatcher,
        request(json!(4), "tools/call", Some(json!({"name": "missing", "arguments": {}}))),
    )
    .await;
    assert_eq!(response.error.unwrap().code, -32601);
}

/// Tests a raising handler becomes a generic error response.
#[tokio::test]
async fn test_handler_failure_becomes_error_response() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(
        &dispatcher,
        request(json!(5), "tools/call", Some(json!({"name": "fail", "arguments": {}}))),
    )
    .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, -32000);
    assert!(error.message.contains("handler exploded"));
}

/// Tests malformed tool-call params are rejected as invalid params.
#[tokio::test]
async fn test_bad_tool_params_are_rejected() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response =
        dispatch(&dispatcher, request(json!(6), "tools/call", Some(json!({"no": "name"})))).await;
    assert_eq!(response.error.unwrap().code, -32602);
}

/// Tests the reserved list methods return empty collections.
#[tokio::test]
async fn test_reserved_lists_are_empty() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(&dispatcher, request(json!(7), "resources/list", None)).await;
    assert_eq!(response.result.unwrap()["resources"], json!([]));
    let response = dispatch(&dispatcher, request(json!(8), "prompts/list", None)).await;
    assert_eq!(response.result.unwrap()["prompts"], json!([]));
}

/// Tests ping answers with a pong and a timestamp.
#[tokio::test]
async fn test_ping_answers_pong() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(&dispatcher, request(json!(9), "ping", None)).await;
    let result = response.result.unwrap();
    assert_eq!(result["pong"], json!(true));
    assert!(result["timestamp"].is_number());
}

/// Tests shutdown acknowledges before signalling the transports.
#[tokio::test]
async fn test_shutdown_acknowledges_then_signals() {
    let (dispatcher, shutdown) = build_dispatcher();
    let notified = shutdown.notified();
    let response = dispatch(&dispatcher, request(json!(10), "shutdown", None)).await;
    assert_eq!(response.result.unwrap()["ok"], json!(true));
    // The signal was stored; a waiter completes immediately.
    notified.await;
}

/// Tests ledger tools are callable end to end through the dispatcher.
#[tokio::test]
async fn test_ledger_status_through_dispatcher() {
    let (dispatcher, _shutdown) = build_dispatcher();
    let response = dispatch(
        &dispatcher,
        request(json!(11), "tools/call", Some(json!({"name": "ledger_status"}))),
    )
    .await;
    let result = response.result.unwrap();
    let decoded: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(decoded["pending"], json!(0));
    assert!(decoded["head_slot"].is_null());
}
