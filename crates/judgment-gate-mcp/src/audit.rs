// judgment-gate-mcp/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for request, guard, and ledger paths.
// Purpose: Emit diagnostics on stderr without touching protocol output.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks. Stdout is reserved for
//! protocol output on the stdio transport, so the default sink writes JSON
//! lines to stderr. Deployments can route events elsewhere by implementing
//! [`GateAuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Request-level audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RpcAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// JSON-RPC method, or empty for transport-level events.
    pub method: String,
    /// Request identifier rendered as a string, when present.
    pub request_id: Option<String>,
    /// JSON-RPC error code when the request failed.
    pub error_code: Option<i64>,
    /// Extra human-readable detail, when useful.
    pub detail: Option<String>,
}

/// Guard-path audit event (pre-check and post-check outcomes).
#[derive(Debug, Clone, Serialize)]
pub struct GuardAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Tool name the event refers to.
    pub tool: String,
    /// Identity of the deciding subsystem, when known.
    pub subsystem: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

/// Ledger-path audit event (appends, flushes, best-effort failures).
#[derive(Debug, Clone, Serialize)]
pub struct LedgerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Block slot involved, when one exists.
    pub slot: Option<u64>,
    /// Human-readable detail.
    pub detail: String,
}

/// Registry build audit event (skipped or failed factories, overwrites).
#[derive(Debug, Clone, Serialize)]
pub struct RegistryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Factory name the event refers to.
    pub factory: String,
    /// Human-readable detail.
    pub detail: String,
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gate diagnostics.
pub trait GateAuditSink: Send + Sync {
    /// Records a request-level event.
    fn rpc(&self, event: RpcAuditEvent);
    /// Records a guard-path event.
    fn guard(&self, event: GuardAuditEvent);
    /// Records a ledger-path event.
    fn ledger(&self, event: LedgerAuditEvent);
    /// Records a registry build event.
    fn registry(&self, event: RegistryAuditEvent);
}

/// Stderr audit sink emitting one JSON line per event.
///
/// Write failures are ignored; diagnostics must never take the server down.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn rpc(&self, event: RpcAuditEvent) {
        emit(&event);
    }

    fn guard(&self, event: GuardAuditEvent) {
        emit(&event);
    }

    fn ledger(&self, event: LedgerAuditEvent) {
        emit(&event);
    }

    fn registry(&self, event: RegistryAuditEvent) {
        emit(&event);
    }
}

/// Audit sink that discards every event.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn rpc(&self, _event: RpcAuditEvent) {}

    fn guard(&self, _event: GuardAuditEvent) {}

    fn ledger(&self, _event: LedgerAuditEvent) {}

    fn registry(&self, _event: RegistryAuditEvent) {}
}

/// Serializes one event to a stderr JSON line.
fn emit<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}

// ============================================================================
// SECTION: Time Helper
// ============================================================================

/// Returns the current unix epoch in milliseconds.
#[must_use]
pub fn now_unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
