// judgment-gate-mcp/src/pipeline.rs
// ============================================================================
// Module: Guarded Execution Pipeline
// Description: Pre-checked, observed, ledger-recorded tool invocation.
// Purpose: Wrap every tools/call with the guard pair and ledger appension.
// Dependencies: judgment-gate-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! Every tool call walks the same state machine: resolve the tool, run the
//! blocking pre-check, run the handler, fire the non-blocking post-check,
//! and append judgment-shaped results to the ledger. A `block` verdict stops
//! the invocation before the handler; a `warn` verdict is logged and
//! execution proceeds. The post-check and the ledger appension are
//! best-effort: their failures are logged and never alter the response the
//! caller already earned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use judgment_gate_core::Chain;
use judgment_gate_core::GuardDecision;
use judgment_gate_core::Guardian;
use judgment_gate_core::JudgmentRecord;
use judgment_gate_core::ObservationRecord;
use judgment_gate_core::Observer;
use judgment_gate_core::PrecheckRequest;
use judgment_gate_core::Timestamp;
use serde_json::Value;

use crate::audit::GateAuditSink;
use crate::audit::GuardAuditEvent;
use crate::audit::LedgerAuditEvent;
use crate::audit::now_unix_millis;
use crate::registry::ToolCatalog;
use crate::registry::ToolError;

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Guarded tool executor shared by the dispatcher.
pub struct GuardedExecutor {
    /// Callable tool catalog.
    catalog: Arc<ToolCatalog>,
    /// Blocking pre-check collaborator.
    guardian: Arc<dyn Guardian>,
    /// Non-blocking post-check collaborator.
    observer: Arc<dyn Observer>,
    /// Ledger receiving judgment-shaped results, when configured.
    ledger: Option<Arc<Chain>>,
    /// Audit sink for guard and ledger diagnostics.
    audit: Arc<dyn GateAuditSink>,
    /// Whether the pre-check runs at all.
    guard_enabled: bool,
}

/// Construction inputs for [`GuardedExecutor`].
pub struct GuardedExecutorConfig {
    /// Callable tool catalog.
    pub catalog: Arc<ToolCatalog>,
    /// Blocking pre-check collaborator.
    pub guardian: Arc<dyn Guardian>,
    /// Non-blocking post-check collaborator.
    pub observer: Arc<dyn Observer>,
    /// Ledger receiving judgment-shaped results, when configured.
    pub ledger: Option<Arc<Chain>>,
    /// Audit sink for guard and ledger diagnostics.
    pub audit: Arc<dyn GateAuditSink>,
    /// Whether the pre-check runs at all.
    pub guard_enabled: bool,
}

impl GuardedExecutor {
    /// Creates a new guarded executor.
    #[must_use]
    pub fn new(config: GuardedExecutorConfig) -> Self {
        Self {
            catalog: config.catalog,
            guardian: config.guardian,
            observer: config.observer,
            ledger: config.ledger,
            audit: config.audit,
            guard_enabled: config.guard_enabled,
        }
    }

    /// Returns the catalog backing this executor.
    #[must_use]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Runs one guarded tool invocation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] before any guard work for an
    /// unregistered name, [`ToolError::GuardBlocked`] on a pre-check veto,
    /// and the handler's own error when execution fails.
    pub async fn execute(
        &self,
        name: &str,
        arguments: Value,
        now: Timestamp,
    ) -> Result<Value, ToolError> {
        let Some(spec) = self.catalog.get(name) else {
            return Err(ToolError::UnknownTool);
        };
        if self.guard_enabled {
            self.precheck(name, &arguments, now)?;
        }
        let started = Instant::now();
        let result = spec.handler.call(arguments.clone()).await;
        let duration_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.spawn_postcheck(name, arguments, &result, duration_ms);
        let output = result?;
        self.append_judgment(name, &output, now);
        Ok(output)
    }

    /// Runs the blocking pre-check, failing open on collaborator errors.
    fn precheck(&self, name: &str, arguments: &Value, now: Timestamp) -> Result<(), ToolError> {
        let request = PrecheckRequest {
            tool_name: name.to_string(),
            input: arguments.clone(),
            timestamp: now,
        };
        let decision = match self.guardian.precheck(&request) {
            Ok(decision) => decision,
            Err(err) => {
                self.audit.guard(GuardAuditEvent {
                    event: "precheck_error",
                    timestamp_ms: now_unix_millis(),
                    tool: name.to_string(),
                    subsystem: None,
                    detail: err.to_string(),
                });
                GuardDecision::Allow
            }
        };
        match decision {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Warn {
                message,
            } => {
                self.audit.guard(GuardAuditEvent {
                    event: "precheck_warn",
                    timestamp_ms: now_unix_millis(),
                    tool: name.to_string(),
                    subsystem: None,
                    detail: message,
                });
                Ok(())
            }
            GuardDecision::Block {
                blocked_by,
                reason,
            } => {
                self.audit.guard(GuardAuditEvent {
                    event: "precheck_block",
                    timestamp_ms: now_unix_millis(),
                    tool: name.to_string(),
                    subsystem: Some(blocked_by.clone()),
                    detail: reason.clone(),
                });
                Err(ToolError::GuardBlocked {
                    blocked_by,
                    reason,
                })
            }
        }
    }

    /// Fires the post-check as an explicit background task.
    ///
    /// The task races independently of the response; its outcome is only
    /// ever observed through the audit sink.
    fn spawn_postcheck(
        &self,
        name: &str,
        input: Value,
        result: &Result<Value, ToolError>,
        duration_ms: u64,
    ) {
        let record = ObservationRecord {
            tool_name: name.to_string(),
            input,
            output: result.as_ref().cloned().unwrap_or(Value::Null),
            duration_ms,
            success: result.is_ok(),
        };
        let observer = Arc::clone(&self.observer);
        let audit = Arc::clone(&self.audit);
        let tool = name.to_string();
        tokio::spawn(async move {
            if let Err(err) = observer.observe(record) {
                audit.guard(GuardAuditEvent {
                    event: "postcheck_error",
                    timestamp_ms: now_unix_millis(),
                    tool,
                    subsystem: None,
                    detail: err.to_string(),
                });
            }
        });
    }

    /// Appends a judgment-shaped result to the ledger, best-effort.
    fn append_judgment(&self, name: &str, output: &Value, now: Timestamp) {
        let Some(ledger) = self.ledger.as_ref() else {
            return;
        };
        let Some(record) = JudgmentRecord::from_tool_output(output, now) else {
            return;
        };
        let id = record.id.clone();
        match ledger.append(record) {
            Ok(outcome) => {
                self.audit.ledger(LedgerAuditEvent {
                    event: "judgment_appended",
                    timestamp_ms: now_unix_millis(),
                    slot: outcome.auto_flush.as_ref().map(|receipt| receipt.slot),
                    detail: format!("{id} pending={} tool={name}", outcome.pending),
                });
            }
            Err(err) => {
                self.audit.ledger(LedgerAuditEvent {
                    event: "judgment_append_failed",
                    timestamp_ms: now_unix_millis(),
                    slot: None,
                    detail: format!("{id}: {err}"),
                });
            }
        }
    }
}
