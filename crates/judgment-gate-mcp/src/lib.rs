// judgment-gate-mcp/src/lib.rs
// ============================================================================
// Module: Judgment Gate MCP
// Description: MCP server, tool registry, and guarded pipeline.
// Purpose: Expose the judgment control plane over stdio and HTTP JSON-RPC.
// Dependencies: judgment-gate-core, judgment-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! Judgment Gate MCP exposes a dependency-gated tool catalog over two
//! transports, vets every `tools/call` through the guarded execution
//! pipeline, and records judgment-shaped results into the proof-of-judgment
//! chain. All tool handlers are thin wrappers over
//! [`judgment_gate_core::Chain`] and the injected collaborators.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod archive;
pub mod audit;
pub mod dispatcher;
pub mod pipeline;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use archive::InMemoryJudgmentArchive;
pub use audit::GateAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use dispatcher::Dispatcher;
pub use dispatcher::PROTOCOL_VERSION;
pub use dispatcher::ServerIdentity;
pub use pipeline::GuardedExecutor;
pub use pipeline::GuardedExecutorConfig;
pub use registry::CollaboratorKey;
pub use registry::Collaborators;
pub use registry::ToolCatalog;
pub use registry::ToolDefinition;
pub use registry::ToolError;
pub use registry::ToolFactory;
pub use registry::ToolHandler;
pub use registry::ToolRegistry;
pub use registry::ToolSpec;
pub use rpc::RpcRequest;
pub use rpc::RpcResponse;
pub use server::GateServer;
pub use server::GateServerError;
pub use telemetry::NoopMetrics;
pub use telemetry::RpcMetrics;
pub use tools::ArchiveToolFactory;
pub use tools::JudgmentToolFactory;
pub use tools::LedgerToolFactory;
