// judgment-gate-mcp/src/bin/judgment-gate-mcp.rs
// ============================================================================
// Module: Judgment Gate MCP Binary
// Description: Composition root for the Judgment Gate server.
// Purpose: Load config, build the chain and catalog, and serve.
// Dependencies: judgment-gate-mcp, judgment-gate-config, tokio
// ============================================================================

//! ## Overview
//! Builds the ledger store from configuration, initializes the chain,
//! registers the built-in tool factories, and serves the configured
//! transport. The scoring engine is an external collaborator; without one
//! the judgment factory is skipped with a logged diagnostic and the ledger
//! tools still serve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use judgment_gate_config::JudgmentGateConfig;
use judgment_gate_config::LedgerStoreType;
use judgment_gate_config::config::server_version;
use judgment_gate_core::Chain;
use judgment_gate_core::ChainConfig;
use judgment_gate_core::FlushOutcome;
use judgment_gate_core::InMemoryLedgerStore;
use judgment_gate_core::NoopGuardian;
use judgment_gate_core::NoopObserver;
use judgment_gate_core::SharedLedgerStore;
use judgment_gate_core::Timestamp;
use judgment_gate_mcp::Collaborators;
use judgment_gate_mcp::Dispatcher;
use judgment_gate_mcp::GateAuditSink;
use judgment_gate_mcp::GateServer;
use judgment_gate_mcp::GateServerError;
use judgment_gate_mcp::GuardedExecutor;
use judgment_gate_mcp::GuardedExecutorConfig;
use judgment_gate_mcp::InMemoryJudgmentArchive;
use judgment_gate_mcp::NoopMetrics;
use judgment_gate_mcp::ServerIdentity;
use judgment_gate_mcp::StderrAuditSink;
use judgment_gate_mcp::ToolRegistry;
use judgment_gate_mcp::audit::LedgerAuditEvent;
use judgment_gate_mcp::audit::now_unix_millis;
use judgment_gate_mcp::tools::ArchiveToolFactory;
use judgment_gate_mcp::tools::JudgmentToolFactory;
use judgment_gate_mcp::tools::LedgerToolFactory;
use judgment_gate_store_sqlite::SqliteLedgerConfig;
use judgment_gate_store_sqlite::SqliteLedgerStore;
use tokio::sync::Notify;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Boots the Judgment Gate server and serves until shutdown.
#[tokio::main]
async fn main() -> Result<(), GateServerError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = JudgmentGateConfig::load(config_path.as_deref())
        .map_err(|err| GateServerError::Config(err.to_string()))?;

    let store = build_store(&config)?;
    let chain = Arc::new(Chain::new(store, ChainConfig {
        flush_threshold: config.ledger.flush_threshold,
    }));
    chain.initialize().map_err(|err| GateServerError::Config(err.to_string()))?;

    let audit = Arc::new(StderrAuditSink);
    let mut registry = ToolRegistry::new(audit.clone());
    registry
        .register(Arc::new(LedgerToolFactory))
        .map_err(|err| GateServerError::Config(err.to_string()))?;
    registry
        .register(Arc::new(JudgmentToolFactory))
        .map_err(|err| GateServerError::Config(err.to_string()))?;
    registry
        .register(Arc::new(ArchiveToolFactory))
        .map_err(|err| GateServerError::Config(err.to_string()))?;

    let collaborators = Collaborators {
        ledger: Some(Arc::clone(&chain)),
        judge: None,
        archive: Some(Arc::new(InMemoryJudgmentArchive::new())),
    };
    let catalog = Arc::new(registry.create_all(&collaborators));

    let executor = Arc::new(GuardedExecutor::new(GuardedExecutorConfig {
        catalog,
        guardian: Arc::new(NoopGuardian),
        observer: Arc::new(NoopObserver),
        ledger: Some(Arc::clone(&chain)),
        audit: audit.clone(),
        guard_enabled: config.guard.enabled,
    }));

    let identity = ServerIdentity {
        name: config.server.name.clone(),
        version: server_version().to_string(),
    };
    let shutdown = Arc::new(Notify::new());
    let dispatcher = Arc::new(Dispatcher::new(identity, executor, shutdown, audit.clone()));

    let server = GateServer::new(config, dispatcher, audit.clone(), Arc::new(NoopMetrics));
    let result = server.serve().await;

    // One final flush so no queued judgment is silently lost.
    match chain.close(Timestamp::from_unix_millis(now_unix_millis())) {
        Ok(outcome) => {
            audit.ledger(LedgerAuditEvent {
                event: "ledger_closed",
                timestamp_ms: now_unix_millis(),
                slot: match &outcome {
                    FlushOutcome::Flushed(receipt) => Some(receipt.slot),
                    FlushOutcome::Empty => None,
                },
                detail: "final flush complete".to_string(),
            });
        }
        Err(err) => {
            audit.ledger(LedgerAuditEvent {
                event: "ledger_close_failed",
                timestamp_ms: now_unix_millis(),
                slot: None,
                detail: err.to_string(),
            });
        }
    }
    result
}

/// Builds the configured ledger store.
fn build_store(config: &JudgmentGateConfig) -> Result<SharedLedgerStore, GateServerError> {
    match config.ledger.store {
        LedgerStoreType::Memory => Ok(SharedLedgerStore::from_store(InMemoryLedgerStore::new())),
        LedgerStoreType::Sqlite => {
            let path = config
                .ledger
                .path
                .clone()
                .ok_or_else(|| GateServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteLedgerStore::new(SqliteLedgerConfig {
                path,
                busy_timeout_ms: config.ledger.busy_timeout_ms,
                journal_mode: config.ledger.journal_mode,
                sync_mode: config.ledger.sync_mode,
            })
            .map_err(|err| GateServerError::Config(err.to_string()))?;
            Ok(SharedLedgerStore::from_store(store))
        }
    }
}
