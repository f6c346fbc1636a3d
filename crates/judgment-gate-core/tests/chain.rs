// judgment-gate-core/tests/chain.rs
// ============================================================================
// Module: Chain Tests
// Description: Tests for the proof-of-judgment chain runtime.
// ============================================================================
//! ## Overview
//! Validates append/flush batching, hash linkage, tamper detection, orphan
//! repair, and the reset confirmation contract.

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
use judgment_gate_core::Chain;
use judgment_gate_core::ChainConfig;
use judgment_gate_core::ChainError;
use judgment_gate_core::FlushOutcome;
use judgment_gate_core::GENESIS_PREV_HASH;
use judgment_gate_core::InMemoryLedgerStore;
use judgment_gate_core::JudgmentId;
use judgment_gate_core::JudgmentOutcome;
use judgment_gate_core::JudgmentRecord;
use judgment_gate_core::LedgerStore;
use judgment_gate_core::RESET_CONFIRMATION_PHRASE;
use judgment_gate_core::SharedLedgerStore;
use judgment_gate_core::Timestamp;
use judgment_gate_core::Verdict;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a pending judgment record for tests.
fn record(id: &str, q_score: f64, at: i64) -> JudgmentRecord {
    let outcome = JudgmentOutcome {
        q_score,
        verdict: Verdict::from_q_score(q_score),
        confidence: 0.5,
        axiom_scores: BTreeMap::new(),
    };
    JudgmentRecord::from_outcome(JudgmentId::new(id), outcome, Timestamp::from_unix_millis(at))
}

/// Builds an initialized chain over a fresh in-memory store.
fn chain_with_store(flush_threshold: usize) -> (Chain, InMemoryLedgerStore) {
    let store = InMemoryLedgerStore::new();
    let chain = Chain::new(
        SharedLedgerStore::from_store(store.clone()),
        ChainConfig {
            flush_threshold,
        },
    );
    chain.initialize().unwrap();
    (chain, store)
}

// ============================================================================
// SECTION: Append and Flush
// ============================================================================

/// Tests the worked scenario: three judgments, flush, one more, flush.
#[test]
fn test_two_flushes_link_and_count() {
    let (chain, _store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.append(record("j2", 65.0, 2)).unwrap();
    chain.append(record("j3", 90.0, 3)).unwrap();

    let FlushOutcome::Flushed(first) = chain.flush(Timestamp::from_unix_millis(10)).unwrap()
    else {
        panic!("expected a sealed block");
    };
    assert_eq!(first.slot, 0);
    assert_eq!(first.judgment_count, 3);
    let block0 = chain.block(0).unwrap().unwrap();
    assert_eq!(block0.prev_hash.value, GENESIS_PREV_HASH);

    chain.append(record("j4", 20.0, 11)).unwrap();
    let FlushOutcome::Flushed(second) = chain.flush(Timestamp::from_unix_millis(20)).unwrap()
    else {
        panic!("expected a sealed block");
    };
    assert_eq!(second.slot, 1);
    assert_eq!(second.judgment_count, 1);
    let block1 = chain.block(1).unwrap().unwrap();
    assert_eq!(block1.prev_hash, block0.hash);

    let report = chain.verify_integrity(0);
    assert!(report.valid);
    assert_eq!(report.blocks_checked, 2);
    assert!(report.errors.is_empty());
}

/// Tests every appended record is stamped exactly once at flush.
#[test]
fn test_flush_stamps_every_record_once() {
    let (chain, store) = chain_with_store(100);
    for index in 0..5 {
        chain.append(record(&format!("j{index}"), 40.0, index)).unwrap();
    }
    let FlushOutcome::Flushed(receipt) = chain.flush(Timestamp::from_unix_millis(9)).unwrap()
    else {
        panic!("expected a sealed block");
    };
    assert_eq!(receipt.judgment_count, 5);
    for index in 0..5 {
        let stored = store.load_judgment(&JudgmentId::new(format!("j{index}"))).unwrap().unwrap();
        assert_eq!(stored.block_number, Some(0));
        assert_eq!(stored.block_hash.as_ref().unwrap(), &receipt.hash);
    }
    assert_eq!(chain.status().unwrap().pending, 0);
    assert!(matches!(
        chain.flush(Timestamp::from_unix_millis(10)).unwrap(),
        FlushOutcome::Empty
    ));
}

/// Tests the append threshold seals a block without an explicit flush.
#[test]
fn test_append_auto_flushes_at_threshold() {
    let (chain, _store) = chain_with_store(3);
    assert!(chain.append(record("j1", 10.0, 1)).unwrap().auto_flush.is_none());
    assert!(chain.append(record("j2", 10.0, 2)).unwrap().auto_flush.is_none());
    let outcome = chain.append(record("j3", 10.0, 3)).unwrap();
    let receipt = outcome.auto_flush.unwrap();
    assert_eq!(receipt.slot, 0);
    assert_eq!(receipt.judgment_count, 3);
    assert_eq!(outcome.pending, 0);
}

/// Tests initialize picks up the persisted head after a restart.
#[test]
fn test_initialize_restores_head() {
    let store = InMemoryLedgerStore::new();
    {
        let chain =
            Chain::new(SharedLedgerStore::from_store(store.clone()), ChainConfig::default());
        chain.initialize().unwrap();
        chain.append(record("j1", 50.0, 1)).unwrap();
        chain.close(Timestamp::from_unix_millis(2)).unwrap();
    }
    let chain = Chain::new(SharedLedgerStore::from_store(store), ChainConfig::default());
    chain.initialize().unwrap();
    let status = chain.status().unwrap();
    assert_eq!(status.head_slot, Some(0));

    chain.append(record("j2", 50.0, 3)).unwrap();
    let FlushOutcome::Flushed(receipt) = chain.flush(Timestamp::from_unix_millis(4)).unwrap()
    else {
        panic!("expected a sealed block");
    };
    assert_eq!(receipt.slot, 1);
    assert!(chain.verify_integrity(0).valid);
}

// ============================================================================
// SECTION: Tamper Detection
// ============================================================================

/// Tests mutating a stored block is reported against that block's slot.
#[test]
fn test_tampered_block_fails_verification() {
    let (chain, store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.append(record("j2", 60.0, 2)).unwrap();
    chain.flush(Timestamp::from_unix_millis(5)).unwrap();
    chain.append(record("j3", 70.0, 6)).unwrap();
    chain.flush(Timestamp::from_unix_millis(9)).unwrap();

    let mut tampered = store.load_block(0).unwrap().unwrap();
    tampered.judgment_ids.push(JudgmentId::new("forged"));
    store.insert_block(&tampered).unwrap();

    let report = chain.verify_integrity(0);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|fault| fault.slot == 0));
    assert_eq!(report.blocks_checked, 2);
}

/// Tests a rewritten timestamp breaks the stored seal hash.
#[test]
fn test_rewritten_timestamp_breaks_seal() {
    let (chain, store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.flush(Timestamp::from_unix_millis(5)).unwrap();

    let mut tampered = store.load_block(0).unwrap().unwrap();
    tampered.timestamp = Timestamp::from_unix_millis(6);
    store.insert_block(&tampered).unwrap();

    let report = chain.verify_integrity(0);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|fault| fault.slot == 0));
}

/// Tests verification from a non-zero slot checks linkage to its anchor.
#[test]
fn test_partial_verification_uses_anchor() {
    let (chain, _store) = chain_with_store(1);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.append(record("j2", 50.0, 2)).unwrap();
    chain.append(record("j3", 50.0, 3)).unwrap();

    let report = chain.verify_integrity(1);
    assert!(report.valid);
    assert_eq!(report.blocks_checked, 2);
}

// ============================================================================
// SECTION: Orphan Repair
// ============================================================================

/// Tests relink repairs judgments a block references but never stamped.
#[test]
fn test_relink_repairs_half_stamped_judgments() {
    let (chain, store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.append(record("j2", 50.0, 2)).unwrap();
    chain.flush(Timestamp::from_unix_millis(5)).unwrap();

    // Simulate the crash artifact: the block exists, one stamp was lost.
    let mut broken = store.load_judgment(&JudgmentId::new("j1")).unwrap().unwrap();
    broken.block_number = None;
    broken.block_hash = None;
    store.insert_judgment(&broken).unwrap();

    let report = chain.relink_orphaned_judgments().unwrap();
    assert_eq!(report.judgments_linked, 1);
    assert_eq!(report.blocks_touched, 1);
    let repaired = store.load_judgment(&JudgmentId::new("j1")).unwrap().unwrap();
    assert_eq!(repaired.block_number, Some(0));
}

/// Tests adopt folds fully orphaned judgments into a recovery block.
#[test]
fn test_adopt_seals_recovery_block() {
    let (chain, store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.flush(Timestamp::from_unix_millis(5)).unwrap();

    // A judgment persisted by a previous process but lost from every queue.
    store.insert_judgment(&record("stray", 30.0, 6)).unwrap();

    let report = chain.adopt_orphaned_judgments(Timestamp::from_unix_millis(9)).unwrap();
    assert_eq!(report.judgments_adopted, 1);
    let receipt = report.block.unwrap();
    assert_eq!(receipt.slot, 1);
    let adopted = store.load_judgment(&JudgmentId::new("stray")).unwrap().unwrap();
    assert_eq!(adopted.block_number, Some(1));
    assert!(chain.verify_integrity(0).valid);
}

/// Tests adopt leaves the live queue alone.
#[test]
fn test_adopt_ignores_queued_judgments() {
    let (chain, _store) = chain_with_store(100);
    chain.append(record("queued", 50.0, 1)).unwrap();
    let report = chain.adopt_orphaned_judgments(Timestamp::from_unix_millis(2)).unwrap();
    assert_eq!(report.judgments_adopted, 0);
    assert!(report.block.is_none());
    assert_eq!(chain.status().unwrap().pending, 1);
}

// ============================================================================
// SECTION: Reset
// ============================================================================

/// Tests reset refuses every phrase except the exact literal.
#[test]
fn test_reset_requires_exact_phrase() {
    let (chain, _store) = chain_with_store(100);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.flush(Timestamp::from_unix_millis(2)).unwrap();

    let refused = chain.reset_all("yes really");
    assert!(matches!(refused, Err(ChainError::ResetRefused)));
    let refused_case = chain.reset_all(&RESET_CONFIRMATION_PHRASE.to_lowercase());
    assert!(matches!(refused_case, Err(ChainError::ResetRefused)));
    assert_eq!(chain.status().unwrap().head_slot, Some(0));

    chain.reset_all(RESET_CONFIRMATION_PHRASE).unwrap();
    let status = chain.status().unwrap();
    assert_eq!(status.head_slot, None);
    assert_eq!(status.pending, 0);
    let stats = chain.stats().unwrap();
    assert_eq!(stats.blocks, 0);
    assert_eq!(stats.judgments, 0);
}

// ============================================================================
// SECTION: Read Surfaces
// ============================================================================

/// Tests recent and export pagination over a short chain.
#[test]
fn test_recent_and_export_views() {
    let (chain, _store) = chain_with_store(1);
    chain.append(record("j1", 50.0, 1)).unwrap();
    chain.append(record("j2", 50.0, 2)).unwrap();
    chain.append(record("j3", 50.0, 3)).unwrap();

    let recent = chain.recent_blocks(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].slot, 2);
    assert_eq!(recent[1].slot, 1);

    let page = chain.export(0, 2).unwrap();
    assert_eq!(page.blocks.len(), 2);
    assert_eq!(page.judgments.len(), 2);
    assert_eq!(page.next_slot, Some(2));
    let rest = chain.export(2, 2).unwrap();
    assert_eq!(rest.blocks.len(), 1);
    assert_eq!(rest.next_slot, None);

    let head: Block = chain.head().unwrap().unwrap();
    assert_eq!(head.slot, 2);
}
