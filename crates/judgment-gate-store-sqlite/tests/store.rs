// judgment-gate-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Ledger Store Tests
// Description: Tests for durable block and judgment persistence.
// ============================================================================
//! ## Overview
//! Validates round-trips, link stamping, pending queries, fail-closed hash
//! verification, and full wipes against a temporary database file.

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

use std::collections::BTreeMap;

use judgment_gate_core::Block;
use judgment_gate_core::JudgmentId;
use judgment_gate_core::JudgmentOutcome;
use judgment_gate_core::JudgmentRecord;
use judgment_gate_core::LedgerStore;
use judgment_gate_core::Timestamp;
use judgment_gate_core::Verdict;
use judgment_gate_core::genesis_digest;
use judgment_gate_store_sqlite::SqliteLedgerConfig;
use judgment_gate_store_sqlite::SqliteLedgerStore;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Opens a store in a fresh temporary directory.
fn open_store() -> (SqliteLedgerStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = SqliteLedgerConfig {
        path: dir.path().join("ledger.sqlite"),
        busy_timeout_ms: 1_000,
        journal_mode: judgment_gate_store_sqlite::SqliteJournalMode::Wal,
        sync_mode: judgment_gate_store_sqlite::SqliteSyncMode::Normal,
    };
    (SqliteLedgerStore::new(config).unwrap(), dir)
}

/// Builds a pending judgment record for tests.
fn record(id: &str, at: i64) -> JudgmentRecord {
    let outcome = JudgmentOutcome {
        q_score: 42.0,
        verdict: Verdict::Growl,
        confidence: 0.3,
        axiom_scores: BTreeMap::from([("consistency".to_string(), 0.5)]),
    };
    JudgmentRecord::from_outcome(JudgmentId::new(id), outcome, Timestamp::from_unix_millis(at))
}

/// Seals a block over the given ids for tests.
fn sealed_block(slot: u64, ids: &[&str], at: i64) -> Block {
    Block::seal(
        slot,
        genesis_digest(),
        ids.iter().map(|id| JudgmentId::new(*id)).collect(),
        Timestamp::from_unix_millis(at),
    )
    .unwrap()
}

// ============================================================================
// SECTION: Round-Trips
// ============================================================================

/// Tests block and judgment round-trips through the database.
#[test]
fn test_round_trip_block_and_judgment() {
    let (store, _dir) = open_store();
    let judgment = record("j1", 1);
    store.insert_judgment(&judgment).unwrap();
    let block = sealed_block(0, &["j1"], 2);
    store.insert_block(&block).unwrap();

    assert_eq!(store.load_judgment(&JudgmentId::new("j1")).unwrap().unwrap(), judgment);
    assert_eq!(store.load_block(0).unwrap().unwrap(), block);
    assert_eq!(store.load_head().unwrap().unwrap(), block);
    assert_eq!(store.block_count().unwrap(), 1);
    assert_eq!(store.judgment_count().unwrap(), 1);
    assert!(store.load_block(7).unwrap().is_none());
}

/// Tests pending listings only return unstamped judgments in append order.
#[test]
fn test_pending_listing_and_linking() {
    let (store, _dir) = open_store();
    store.insert_judgment(&record("j1", 1)).unwrap();
    store.insert_judgment(&record("j2", 2)).unwrap();
    store.insert_judgment(&record("j3", 3)).unwrap();

    let block = sealed_block(0, &["j1", "j2"], 4);
    store.insert_block(&block).unwrap();
    let updated = store
        .link_judgments(&[JudgmentId::new("j1"), JudgmentId::new("j2")], 0, &block.hash)
        .unwrap();
    assert_eq!(updated, 2);

    let pending = store.load_pending_judgments().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id.as_str(), "j3");

    let stamped = store.load_judgment(&JudgmentId::new("j1")).unwrap().unwrap();
    assert_eq!(stamped.block_number, Some(0));
    assert_eq!(stamped.block_hash.unwrap(), block.hash);
}

/// Tests stamping is idempotent: an already-settled judgment keeps its block.
#[test]
fn test_linking_never_restamps() {
    let (store, _dir) = open_store();
    store.insert_judgment(&record("j1", 1)).unwrap();
    let first = sealed_block(0, &["j1"], 2);
    store.insert_block(&first).unwrap();
    store.link_judgments(&[JudgmentId::new("j1")], 0, &first.hash).unwrap();

    let second = sealed_block(1, &["j1"], 3);
    let updated = store.link_judgments(&[JudgmentId::new("j1")], 1, &second.hash).unwrap();
    assert_eq!(updated, 0);
    let stored = store.load_judgment(&JudgmentId::new("j1")).unwrap().unwrap();
    assert_eq!(stored.block_number, Some(0));
}

/// Tests ranged block loads respect order and limit.
#[test]
fn test_load_blocks_range() {
    let (store, _dir) = open_store();
    for slot in 0..5u64 {
        store.insert_block(&sealed_block(slot, &["j"], 10 + i64::try_from(slot).unwrap())).unwrap();
    }
    let blocks = store.load_blocks(1, 3).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].slot, 1);
    assert_eq!(blocks[2].slot, 3);
}

// ============================================================================
// SECTION: Fail-Closed Loading
// ============================================================================

/// Tests a corrupted snapshot fails closed on load.
#[test]
fn test_corrupted_snapshot_fails_closed() {
    let (store, dir) = open_store();
    store.insert_judgment(&record("j1", 1)).unwrap();

    // Flip the stored payload underneath the snapshot hash.
    let connection = rusqlite::Connection::open(dir.path().join("ledger.sqlite")).unwrap();
    connection
        .execute(
            "UPDATE judgments SET judgment_json = ?1 WHERE judgment_id = 'j1'",
            rusqlite::params![b"{\"forged\":true}".to_vec()],
        )
        .unwrap();

    let loaded = store.load_judgment(&JudgmentId::new("j1"));
    assert!(loaded.is_err());
}

/// Tests persistence survives reopening the database.
#[test]
fn test_reopen_preserves_state() {
    let dir = TempDir::new().unwrap();
    let config = SqliteLedgerConfig {
        path: dir.path().join("ledger.sqlite"),
        busy_timeout_ms: 1_000,
        journal_mode: judgment_gate_store_sqlite::SqliteJournalMode::Wal,
        sync_mode: judgment_gate_store_sqlite::SqliteSyncMode::Normal,
    };
    {
        let store = SqliteLedgerStore::new(config.clone()).unwrap();
        store.insert_block(&sealed_block(0, &["j1"], 2)).unwrap();
    }
    let store = SqliteLedgerStore::new(config).unwrap();
    assert_eq!(store.load_head().unwrap().unwrap().slot, 0);
}

/// Tests clearing removes every row.
#[test]
fn test_clear_all_wipes_everything() {
    let (store, _dir) = open_store();
    store.insert_judgment(&record("j1", 1)).unwrap();
    store.insert_block(&sealed_block(0, &["j1"], 2)).unwrap();
    store.clear_all().unwrap();
    assert_eq!(store.block_count().unwrap(), 0);
    assert_eq!(store.judgment_count().unwrap(), 0);
    assert!(store.load_head().unwrap().is_none());
}
