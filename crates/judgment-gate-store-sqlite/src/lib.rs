// judgment-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Judgment Gate SQLite Store Library
// Description: Durable LedgerStore implementation backed by SQLite.
// Purpose: Expose the SQLite ledger store and its configuration.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! This crate provides a durable [`judgment_gate_core::LedgerStore`] backed
//! by `SQLite` with WAL journaling. Blocks and judgments are stored as
//! canonical JSON snapshots with content hashes verified on load.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteLedgerConfig;
pub use store::SqliteLedgerStore;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
