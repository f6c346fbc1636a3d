// judgment-gate-mcp/tests/registry.rs
// ============================================================================
// Module: Tool Registry Tests
// Description: Tests for factory eligibility and total catalog builds.
// ============================================================================
//! ## Overview
//! Validates dependency gating, skip diagnostics, failure isolation, and the
//! documented last-wins policies.

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
use std::sync::Mutex;

use judgment_gate_core::Chain;
use judgment_gate_core::ChainConfig;
use judgment_gate_core::InMemoryLedgerStore;
use judgment_gate_core::SharedLedgerStore;
use judgment_gate_mcp::CollaboratorKey;
use judgment_gate_mcp::Collaborators;
use judgment_gate_mcp::LedgerToolFactory;
use judgment_gate_mcp::ToolError;
use judgment_gate_mcp::ToolFactory;
use judgment_gate_mcp::ToolHandler;
use judgment_gate_mcp::ToolRegistry;
use judgment_gate_mcp::ToolSpec;
use judgment_gate_mcp::audit::GateAuditSink;
use judgment_gate_mcp::audit::GuardAuditEvent;
use judgment_gate_mcp::audit::LedgerAuditEvent;
use judgment_gate_mcp::audit::RegistryAuditEvent;
use judgment_gate_mcp::audit::RpcAuditEvent;
use judgment_gate_mcp::registry::ToolBuildError;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Audit sink capturing registry event names for assertions.
#[derive(Default)]
struct RecordingAuditSink {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingAuditSink {
    fn registry_events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }
}

impl GateAuditSink for RecordingAuditSink {
    fn rpc(&self, _event: RpcAuditEvent) {}

    fn guard(&self, _event: GuardAuditEvent) {}

    fn ledger(&self, _event: LedgerAuditEvent) {}

    fn registry(&self, event: RegistryAuditEvent) {
        self.events.lock().unwrap().push((event.event.to_string(), event.factory));
    }
}

/// Trivial handler answering with a constant.
struct ConstHandler {
    answer: Value,
}

#[async_trait::async_trait]
impl ToolHandler for ConstHandler {
    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(self.answer.clone())
    }
}

/// Factory yielding one constant tool, optionally requiring collaborators.
struct ConstFactory {
    name: &'static str,
    tool: &'static str,
    answer: Value,
    requires: BTreeSet<CollaboratorKey>,
}

impl ToolFactory for ConstFactory {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> &str {
        "test"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        self.requires.clone()
    }

    fn create(&self, _collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        Ok(vec![ToolSpec {
            name: self.tool.to_string(),
            description: "constant test tool".to_string(),
            input_schema: json!({"type": "object"}),
            handler: Arc::new(ConstHandler {
                answer: self.answer.clone(),
            }),
        }])
    }
}

/// Factory whose create call always fails.
struct BrokenFactory;

impl ToolFactory for BrokenFactory {
    fn name(&self) -> &str {
        "broken"
    }

    fn domain(&self) -> &str {
        "test"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        BTreeSet::new()
    }

    fn create(&self, _collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        Err(ToolBuildError::Factory("deliberately broken".to_string()))
    }
}

/// Builds a chain collaborator over a fresh in-memory store.
fn test_chain() -> Arc<Chain> {
    let chain = Chain::new(
        SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
        ChainConfig::default(),
    );
    chain.initialize().unwrap();
    Arc::new(chain)
}

// ============================================================================
// SECTION: Eligibility
// ============================================================================

/// Tests an unmet requirement skips the factory while others still build.
#[test]
fn test_missing_collaborator_skips_factory_only() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit.clone());
    registry
        .register(Arc::new(ConstFactory {
            name: "needs-ledger",
            tool: "gated",
            answer: json!(1),
            requires: BTreeSet::from([CollaboratorKey::Ledger]),
        }))
        .unwrap();
    registry
        .register(Arc::new(ConstFactory {
            name: "free",
            tool: "open",
            answer: json!(2),
            requires: BTreeSet::new(),
        }))
        .unwrap();

    let catalog = registry.create_all(&Collaborators::default());
    assert!(catalog.get("gated").is_none());
    assert!(catalog.get("open").is_some());
    assert_eq!(catalog.len(), 1);
    let events = audit.registry_events();
    assert!(events.contains(&("factory_skipped".to_string(), "needs-ledger".to_string())));
}

/// Tests a satisfied requirement builds the gated factory.
#[test]
fn test_satisfied_requirement_builds_tools() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit);
    registry.register(Arc::new(LedgerToolFactory)).unwrap();
    let collaborators = Collaborators {
        ledger: Some(test_chain()),
        judge: None,
        archive: None,
    };
    let catalog = registry.create_all(&collaborators);
    assert_eq!(catalog.len(), 11);
    assert!(catalog.get("ledger_status").is_some());
    assert!(catalog.get("ledger_reset").is_some());
}

// ============================================================================
// SECTION: Totality
// ============================================================================

/// Tests a failing factory is logged and skipped, never fatal.
#[test]
fn test_failing_factory_is_isolated() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit.clone());
    registry.register(Arc::new(BrokenFactory)).unwrap();
    registry
        .register(Arc::new(ConstFactory {
            name: "free",
            tool: "open",
            answer: json!(2),
            requires: BTreeSet::new(),
        }))
        .unwrap();

    let catalog = registry.create_all(&Collaborators::default());
    assert_eq!(catalog.len(), 1);
    let events = audit.registry_events();
    assert!(events.contains(&("factory_failed".to_string(), "broken".to_string())));
}

// ============================================================================
// SECTION: Last-Wins Policies
// ============================================================================

/// Tests a duplicate tool name overwrites the earlier entry.
#[tokio::test]
async fn test_duplicate_tool_name_last_wins() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit.clone());
    registry
        .register(Arc::new(ConstFactory {
            name: "first",
            tool: "shared",
            answer: json!("first"),
            requires: BTreeSet::new(),
        }))
        .unwrap();
    registry
        .register(Arc::new(ConstFactory {
            name: "second",
            tool: "shared",
            answer: json!("second"),
            requires: BTreeSet::new(),
        }))
        .unwrap();

    let catalog = registry.create_all(&Collaborators::default());
    assert_eq!(catalog.len(), 1);
    let spec = catalog.get("shared").unwrap();
    let answer = spec.handler.call(Value::Null).await.unwrap();
    assert_eq!(answer, json!("second"));
    let events = audit.registry_events();
    assert!(events.contains(&("tool_replaced".to_string(), "second".to_string())));
}

/// Tests re-registering a factory name replaces it in place.
#[test]
fn test_duplicate_factory_name_last_wins() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit);
    registry
        .register(Arc::new(ConstFactory {
            name: "same",
            tool: "one",
            answer: json!(1),
            requires: BTreeSet::new(),
        }))
        .unwrap();
    registry
        .register(Arc::new(ConstFactory {
            name: "same",
            tool: "two",
            answer: json!(2),
            requires: BTreeSet::new(),
        }))
        .unwrap();
    assert_eq!(registry.len(), 1);
    let catalog = registry.create_all(&Collaborators::default());
    assert!(catalog.get("one").is_none());
    assert!(catalog.get("two").is_some());
}

/// Tests an empty factory name is rejected.
#[test]
fn test_unnamed_factory_is_rejected() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut registry = ToolRegistry::new(audit);
    let result = registry.register(Arc::new(ConstFactory {
        name: "",
        tool: "ghost",
        answer: json!(0),
        requires: BTreeSet::new(),
    }));
    assert!(result.is_err());
    assert!(registry.is_empty());
}
