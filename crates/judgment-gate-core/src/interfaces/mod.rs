// judgment-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Judgment Gate Interfaces
// Description: Backend-agnostic interfaces for storage, guarding, and scoring.
// Purpose: Define the contract surfaces used by the Judgment Gate runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Judgment Gate integrates with external systems
//! without embedding backend-specific details. The ledger store must fail
//! closed on missing or invalid data; the guard pair is the one seam that
//! deliberately fails open, because a broken policy collaborator must not
//! take the whole control plane down with it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Block;
use crate::core::HashDigest;
use crate::core::JudgmentId;
use crate::core::JudgmentOutcome;
use crate::core::JudgmentRecord;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    /// Store I/O error.
    #[error("ledger store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("ledger store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("ledger store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("ledger store error: {0}")]
    Store(String),
}

/// Persistence seam for blocks and judgment records.
pub trait LedgerStore {
    /// Inserts a pending judgment record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the insert fails.
    fn insert_judgment(&self, record: &JudgmentRecord) -> Result<(), LedgerStoreError>;

    /// Stamps the listed judgments with their block number and hash.
    ///
    /// Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the update fails.
    fn link_judgments(
        &self,
        ids: &[JudgmentId],
        block_number: u64,
        block_hash: &HashDigest,
    ) -> Result<u64, LedgerStoreError>;

    /// Inserts a sealed block.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the insert fails.
    fn insert_block(&self, block: &Block) -> Result<(), LedgerStoreError>;

    /// Loads the block at the given slot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when loading fails.
    fn load_block(&self, slot: u64) -> Result<Option<Block>, LedgerStoreError>;

    /// Loads up to `limit` blocks starting at `from_slot`, in slot order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when loading fails.
    fn load_blocks(&self, from_slot: u64, limit: usize) -> Result<Vec<Block>, LedgerStoreError>;

    /// Loads the block with the highest slot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when loading fails.
    fn load_head(&self) -> Result<Option<Block>, LedgerStoreError>;

    /// Loads one judgment record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when loading fails.
    fn load_judgment(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, LedgerStoreError>;

    /// Loads every judgment record with no block stamp, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when loading fails.
    fn load_pending_judgments(&self) -> Result<Vec<JudgmentRecord>, LedgerStoreError>;

    /// Returns the number of stored blocks.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when counting fails.
    fn block_count(&self) -> Result<u64, LedgerStoreError>;

    /// Returns the number of stored judgment records.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when counting fails.
    fn judgment_count(&self) -> Result<u64, LedgerStoreError>;

    /// Destroys all stored chain state.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the wipe fails.
    fn clear_all(&self) -> Result<(), LedgerStoreError>;
}

// ============================================================================
// SECTION: Guard Pair
// ============================================================================

/// Guard capability errors.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Guard collaborator reported an error.
    #[error("guard error: {0}")]
    Guard(String),
}

/// Request payload handed to the blocking pre-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecheckRequest {
    /// Name of the tool about to run.
    pub tool_name: String,
    /// Raw tool arguments.
    pub input: Value,
    /// Host-supplied invocation timestamp.
    pub timestamp: Timestamp,
}

/// Pre-check verdict for a pending tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Let the invocation proceed.
    Allow,
    /// Let the invocation proceed, but record the concern.
    Warn {
        /// Human-readable warning.
        message: String,
    },
    /// Veto the invocation before the handler runs.
    Block {
        /// Identity of the blocking subsystem.
        blocked_by: String,
        /// Human-readable block reason surfaced to the caller.
        reason: String,
    },
}

/// Blocking pre-check capability consulted before every tool handler.
pub trait Guardian: Send + Sync {
    /// Evaluates a pending invocation.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError`] when the collaborator fails; callers treat a
    /// failure as [`GuardDecision::Allow`] and log it (fail-open).
    fn precheck(&self, request: &PrecheckRequest) -> Result<GuardDecision, GuardError>;
}

/// Observation payload handed to the non-blocking post-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Name of the tool that ran.
    pub tool_name: String,
    /// Raw tool arguments.
    pub input: Value,
    /// Tool output, or `null` when the handler failed.
    pub output: Value,
    /// Wall-clock handler duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the handler completed without error.
    pub success: bool,
}

/// Non-blocking post-check capability fired after every tool handler.
///
/// The outcome never influences the response already decided for the caller;
/// failures are only ever observed through logging.
pub trait Observer: Send + Sync {
    /// Records one completed invocation.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError`] when the collaborator fails.
    fn observe(&self, record: ObservationRecord) -> Result<(), GuardError>;
}

/// Guardian that allows every invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGuardian;

impl Guardian for NoopGuardian {
    fn precheck(&self, _request: &PrecheckRequest) -> Result<GuardDecision, GuardError> {
        Ok(GuardDecision::Allow)
    }
}

/// Observer that discards every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _record: ObservationRecord) -> Result<(), GuardError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Judgment Engine
// ============================================================================

/// Judgment engine errors.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Scoring collaborator reported an error.
    #[error("judgment engine error: {0}")]
    Engine(String),
}

/// Opaque scoring collaborator: takes an item and context, returns a verdict.
///
/// How the score is computed is entirely the collaborator's concern; the
/// gate only records what comes back.
pub trait JudgmentEngine: Send + Sync {
    /// Scores one item.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError`] when scoring fails.
    fn judge(&self, item: &Value, context: &Value) -> Result<JudgmentOutcome, JudgeError>;
}

// ============================================================================
// SECTION: Judgment Archive
// ============================================================================

/// Judgment archive errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive collaborator reported an error.
    #[error("judgment archive error: {0}")]
    Archive(String),
}

/// External persistence boundary for judgment history.
///
/// This is the collaborator contract consumed by tools; the ledger does not
/// depend on it and its fallback policy belongs to the implementation.
pub trait JudgmentArchive: Send + Sync {
    /// Records one judgment.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when recording fails.
    fn record(&self, record: &JudgmentRecord) -> Result<(), ArchiveError>;

    /// Fetches one judgment by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the lookup fails.
    fn fetch(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, ArchiveError>;

    /// Returns the most recent judgments, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the query fails.
    fn recent(&self, limit: usize) -> Result<Vec<JudgmentRecord>, ArchiveError>;
}
