// judgment-gate-core/src/runtime/chain.rs
// ============================================================================
// Module: Proof-of-Judgment Chain
// Description: Hash-linked ledger batching judgment records into blocks.
// Purpose: Provide append, flush, verification, repair, and reset operations.
// Dependencies: crate::core, crate::interfaces, crate::runtime::store
// ============================================================================

//! ## Overview
//! The chain keeps two pieces of mutable state behind one mutex: the head
//! block and the pending queue. Appends only ever grow the queue; a flush
//! drains it atomically into a sealed block (snapshot-then-clear, never a
//! partial drain). Verification recomputes every stored hash and Merkle root
//! and reports faults instead of raising. Repair is explicit: `relink` fixes
//! judgments a crash left half-stamped, `adopt` folds fully orphaned
//! judgments into a recovery block. Reset demands an exact confirmation
//! phrase and is the only irreversible operation in the system.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Serialize;
use thiserror::Error;

use crate::core::Block;
use crate::core::BlockSealError;
use crate::core::GENESIS_PREV_HASH;
use crate::core::HashDigest;
use crate::core::JudgmentId;
use crate::core::JudgmentRecord;
use crate::core::Timestamp;
use crate::core::genesis_digest;
use crate::interfaces::LedgerStore;
use crate::interfaces::LedgerStoreError;
use crate::runtime::store::SharedLedgerStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confirmation phrase required by [`Chain::reset_all`]; anything else refuses.
pub const RESET_CONFIRMATION_PHRASE: &str = "BURN-THE-LEDGER-AND-ANSWER-FOR-IT";

/// Default pending-queue size that triggers an automatic flush.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 10;

/// Block batch size used when scanning the chain.
const SCAN_BATCH: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Chain tuning parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChainConfig {
    /// Pending-queue size that triggers an automatic flush on append.
    pub flush_threshold: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chain operation errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Underlying ledger store failed.
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
    /// Block sealing failed.
    #[error(transparent)]
    Seal(#[from] BlockSealError),
    /// Chain state mutex was poisoned.
    #[error("chain state mutex poisoned")]
    Poisoned,
    /// Reset confirmation phrase did not match exactly.
    #[error("reset refused: confirmation phrase mismatch")]
    ResetRefused,
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Receipt for one sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReceipt {
    /// Slot of the sealed block.
    pub slot: u64,
    /// Hash of the sealed block.
    pub hash: HashDigest,
    /// Number of judgments sealed.
    pub judgment_count: u64,
}

/// Outcome of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// The pending queue was empty; nothing to do.
    Empty,
    /// A block was sealed from the queue contents.
    Flushed(FlushReceipt),
}

/// Outcome of one append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Pending-queue size after the append (zero if it auto-flushed).
    pub pending: usize,
    /// Receipt for the block sealed by threshold auto-flush, when one fired.
    pub auto_flush: Option<FlushReceipt>,
}

/// Classification of one integrity fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFaultKind {
    /// Stored block hash does not match the recomputed seal hash.
    HashMismatch,
    /// Stored `prev_hash` does not match the previous block's hash.
    PrevHashMismatch,
    /// Stored Merkle root does not match the stored judgment set.
    MerkleMismatch,
    /// A slot in the walked range has no stored block.
    MissingBlock,
    /// The store failed while walking the chain.
    Store,
}

/// One integrity fault referencing the slot where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityFault {
    /// Slot the fault refers to.
    pub slot: u64,
    /// Fault classification.
    pub kind: IntegrityFaultKind,
    /// Human-readable fault detail.
    pub detail: String,
}

/// Result of one integrity walk. Faults are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// True when no fault was found.
    pub valid: bool,
    /// Number of blocks actually loaded and checked.
    pub blocks_checked: u64,
    /// Every fault found during the walk.
    pub errors: Vec<IntegrityFault>,
}

/// Result of one relink pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelinkReport {
    /// Judgments whose block stamps were repaired.
    pub judgments_linked: u64,
    /// Blocks that had at least one repaired judgment.
    pub blocks_touched: u64,
}

/// Result of one adopt pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdoptReport {
    /// Judgments folded into the recovery block.
    pub judgments_adopted: u64,
    /// Receipt for the recovery block, when one was sealed.
    pub block: Option<FlushReceipt>,
}

/// Point-in-time chain status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    /// Slot of the head block, or `None` for an empty chain.
    pub head_slot: Option<u64>,
    /// Hash of the head block, or `None` for an empty chain.
    pub head_hash: Option<HashDigest>,
    /// Live pending-queue size.
    pub pending: usize,
}

/// Aggregate chain statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    /// Total stored blocks.
    pub blocks: u64,
    /// Total stored judgment records.
    pub judgments: u64,
    /// Live pending-queue size.
    pub pending: usize,
    /// Configured auto-flush threshold.
    pub flush_threshold: usize,
}

/// One page of exported chain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBatch {
    /// Exported blocks in slot order.
    pub blocks: Vec<Block>,
    /// Judgment records referenced by the exported blocks.
    pub judgments: Vec<JudgmentRecord>,
    /// Slot to continue from, when more blocks may remain.
    pub next_slot: Option<u64>,
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Mutable chain state behind the mutex.
#[derive(Debug, Default)]
struct ChainState {
    /// Last sealed block, or `None` for an empty chain.
    head: Option<Block>,
    /// Judgments appended since the last flush, in append order.
    pending: Vec<JudgmentRecord>,
}

/// The proof-of-judgment chain.
///
/// # Invariants
/// - For every block at slot `s > 0`, `prev_hash` equals the hash of the
///   block at slot `s - 1`; slot zero links to the reserved genesis value.
/// - The pending queue grows only via [`Chain::append`] and shrinks only via
///   an atomic flush; there are no partial drains.
/// - Every judgment is stamped with its block exactly once.
pub struct Chain {
    /// Persistence backend for blocks and judgments.
    store: SharedLedgerStore,
    /// Head pointer and pending queue behind the one chain mutex.
    state: Mutex<ChainState>,
    /// Pending-queue size that triggers an automatic flush.
    flush_threshold: usize,
}

impl Chain {
    /// Creates an uninitialized chain over the given store.
    ///
    /// Call [`Chain::initialize`] before serving traffic so the head pointer
    /// reflects persisted state.
    #[must_use]
    pub fn new(store: SharedLedgerStore, config: ChainConfig) -> Self {
        Self {
            store,
            state: Mutex::new(ChainState::default()),
            flush_threshold: config.flush_threshold.max(1),
        }
    }

    /// Loads the persisted head block into the live state.
    ///
    /// Judgments a previous process appended but never flushed stay in the
    /// store as orphans until an operator runs relink or adopt.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read.
    pub fn initialize(&self) -> Result<(), ChainError> {
        let head = self.store.load_head()?;
        let mut state = self.lock()?;
        state.head = head;
        drop(state);
        Ok(())
    }

    /// Appends a pending judgment, auto-flushing at the configured threshold.
    ///
    /// The append itself never blocks beyond the store insert and the
    /// in-memory enqueue; when the threshold fires, the sealed receipt is
    /// returned in the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when persistence or sealing fails.
    pub fn append(&self, record: JudgmentRecord) -> Result<AppendOutcome, ChainError> {
        let mut state = self.lock()?;
        self.store.insert_judgment(&record)?;
        let sealed_at = record.created_at;
        state.pending.push(record);
        let auto_flush = if state.pending.len() >= self.flush_threshold {
            match self.flush_locked(&mut state, sealed_at)? {
                FlushOutcome::Flushed(receipt) => Some(receipt),
                FlushOutcome::Empty => None,
            }
        } else {
            None
        };
        Ok(AppendOutcome {
            pending: state.pending.len(),
            auto_flush,
        })
    }

    /// Seals every queued judgment into the next block.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when persistence or sealing fails.
    pub fn flush(&self, now: Timestamp) -> Result<FlushOutcome, ChainError> {
        let mut state = self.lock()?;
        self.flush_locked(&mut state, now)
    }

    /// Flushes while already holding the chain mutex.
    ///
    /// Snapshot-then-clear: the block is computed and persisted from the
    /// current queue contents before the queue is touched, so a judgment is
    /// never simultaneously counted in the old queue and the new block.
    fn flush_locked(
        &self,
        state: &mut MutexGuard<'_, ChainState>,
        now: Timestamp,
    ) -> Result<FlushOutcome, ChainError> {
        if state.pending.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        let (slot, prev_hash) = next_link(state.head.as_ref());
        let ids: Vec<JudgmentId> = state.pending.iter().map(|record| record.id.clone()).collect();
        let block = Block::seal(slot, prev_hash, ids, now)?;
        self.store.insert_block(&block)?;
        self.store.link_judgments(&block.judgment_ids, block.slot, &block.hash)?;
        let receipt = FlushReceipt {
            slot: block.slot,
            hash: block.hash.clone(),
            judgment_count: block.judgment_count,
        };
        state.head = Some(block);
        state.pending.clear();
        Ok(FlushOutcome::Flushed(receipt))
    }

    /// Walks the chain from `from_slot` to head, recomputing every hash.
    ///
    /// Store failures become report entries; this method never raises.
    #[must_use]
    pub fn verify_integrity(&self, from_slot: u64) -> IntegrityReport {
        let mut errors: Vec<IntegrityFault> = Vec::new();
        let mut blocks_checked = 0u64;
        let head_slot = match self.store.load_head() {
            Ok(Some(head)) => head.slot,
            Ok(None) => {
                return IntegrityReport {
                    valid: true,
                    blocks_checked: 0,
                    errors,
                };
            }
            Err(err) => {
                errors.push(fault(from_slot, IntegrityFaultKind::Store, err.to_string()));
                return IntegrityReport {
                    valid: false,
                    blocks_checked: 0,
                    errors,
                };
            }
        };
        let mut prev_hash = self.linkage_anchor(from_slot, &mut errors);
        let mut slot = from_slot;
        while slot <= head_slot {
            match self.store.load_block(slot) {
                Ok(Some(block)) => {
                    blocks_checked = blocks_checked.saturating_add(1);
                    check_block(&block, slot, prev_hash.as_ref(), &mut errors);
                    prev_hash = Some(block.hash);
                }
                Ok(None) => {
                    errors.push(fault(
                        slot,
                        IntegrityFaultKind::MissingBlock,
                        format!("no block stored at slot {slot}"),
                    ));
                    prev_hash = None;
                }
                Err(err) => {
                    errors.push(fault(slot, IntegrityFaultKind::Store, err.to_string()));
                    prev_hash = None;
                }
            }
            let Some(next) = slot.checked_add(1) else {
                break;
            };
            slot = next;
        }
        IntegrityReport {
            valid: errors.is_empty(),
            blocks_checked,
            errors,
        }
    }

    /// Loads the hash the first verified block must link to.
    fn linkage_anchor(
        &self,
        from_slot: u64,
        errors: &mut Vec<IntegrityFault>,
    ) -> Option<HashDigest> {
        let anchor_slot = from_slot.checked_sub(1)?;
        match self.store.load_block(anchor_slot) {
            Ok(Some(block)) => Some(block.hash),
            Ok(None) => {
                errors.push(fault(
                    anchor_slot,
                    IntegrityFaultKind::MissingBlock,
                    format!("linkage anchor missing at slot {anchor_slot}"),
                ));
                None
            }
            Err(err) => {
                errors.push(fault(anchor_slot, IntegrityFaultKind::Store, err.to_string()));
                None
            }
        }
    }

    /// Repairs judgments referenced by a block but missing their stamps.
    ///
    /// This is the recovery verb for a crash between block persistence and
    /// judgment stamping.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read or updated.
    pub fn relink_orphaned_judgments(&self) -> Result<RelinkReport, ChainError> {
        let mut state = self.lock()?;
        let mut judgments_linked = 0u64;
        let mut blocks_touched = 0u64;
        let mut from_slot = 0u64;
        loop {
            let blocks = self.store.load_blocks(from_slot, SCAN_BATCH)?;
            let Some(last) = blocks.last() else {
                break;
            };
            let next_from = last.slot.checked_add(1);
            for block in &blocks {
                let mut orphaned: Vec<JudgmentId> = Vec::new();
                for id in &block.judgment_ids {
                    if let Some(record) = self.store.load_judgment(id)?
                        && record.block_number.is_none()
                    {
                        orphaned.push(id.clone());
                    }
                }
                if !orphaned.is_empty() {
                    let updated =
                        self.store.link_judgments(&orphaned, block.slot, &block.hash)?;
                    judgments_linked = judgments_linked.saturating_add(updated);
                    blocks_touched = blocks_touched.saturating_add(1);
                    state.pending.retain(|record| !orphaned.contains(&record.id));
                }
            }
            let Some(next_from) = next_from else {
                break;
            };
            if blocks.len() < SCAN_BATCH {
                break;
            }
            from_slot = next_from;
        }
        drop(state);
        Ok(RelinkReport {
            judgments_linked,
            blocks_touched,
        })
    }

    /// Folds judgments referenced by no block into a new recovery block.
    ///
    /// A judgment qualifies when it is stored without a block stamp, is not
    /// sitting in the live pending queue (those settle on the next regular
    /// flush), and no block's id list claims it.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read or updated.
    pub fn adopt_orphaned_judgments(&self, now: Timestamp) -> Result<AdoptReport, ChainError> {
        let mut state = self.lock()?;
        let stored_pending = self.store.load_pending_judgments()?;
        let queued: BTreeSet<JudgmentId> =
            state.pending.iter().map(|record| record.id.clone()).collect();
        let referenced = self.referenced_ids()?;
        let adoptable: Vec<JudgmentId> = stored_pending
            .into_iter()
            .filter(|record| !queued.contains(&record.id) && !referenced.contains(&record.id))
            .map(|record| record.id)
            .collect();
        if adoptable.is_empty() {
            return Ok(AdoptReport {
                judgments_adopted: 0,
                block: None,
            });
        }
        let (slot, prev_hash) = next_link(state.head.as_ref());
        let block = Block::seal(slot, prev_hash, adoptable, now)?;
        self.store.insert_block(&block)?;
        self.store.link_judgments(&block.judgment_ids, block.slot, &block.hash)?;
        let receipt = FlushReceipt {
            slot: block.slot,
            hash: block.hash.clone(),
            judgment_count: block.judgment_count,
        };
        state.head = Some(block);
        Ok(AdoptReport {
            judgments_adopted: receipt.judgment_count,
            block: Some(receipt),
        })
    }

    /// Collects every judgment id referenced by any stored block.
    fn referenced_ids(&self) -> Result<BTreeSet<JudgmentId>, ChainError> {
        let mut referenced = BTreeSet::new();
        let mut from_slot = 0u64;
        loop {
            let blocks = self.store.load_blocks(from_slot, SCAN_BATCH)?;
            let Some(last) = blocks.last() else {
                break;
            };
            let next_from = last.slot.checked_add(1);
            for block in &blocks {
                referenced.extend(block.judgment_ids.iter().cloned());
            }
            let Some(next_from) = next_from else {
                break;
            };
            if blocks.len() < SCAN_BATCH {
                break;
            }
            from_slot = next_from;
        }
        Ok(referenced)
    }

    /// Destroys all chain state. The one irreversible operation.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::ResetRefused`] unless `confirmation` equals
    /// [`RESET_CONFIRMATION_PHRASE`] exactly; state is untouched on refusal.
    pub fn reset_all(&self, confirmation: &str) -> Result<(), ChainError> {
        if confirmation != RESET_CONFIRMATION_PHRASE {
            return Err(ChainError::ResetRefused);
        }
        let mut state = self.lock()?;
        self.store.clear_all()?;
        state.head = None;
        state.pending.clear();
        drop(state);
        Ok(())
    }

    /// Flushes once so no queued judgment is lost at shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the final flush fails.
    pub fn close(&self, now: Timestamp) -> Result<FlushOutcome, ChainError> {
        self.flush(now)
    }

    /// Returns the current head block, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Poisoned`] when the state mutex is poisoned.
    pub fn head(&self) -> Result<Option<Block>, ChainError> {
        Ok(self.lock()?.head.clone())
    }

    /// Loads the block at the given slot.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read.
    pub fn block(&self, slot: u64) -> Result<Option<Block>, ChainError> {
        Ok(self.store.load_block(slot)?)
    }

    /// Returns up to `limit` most recent blocks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read.
    pub fn recent_blocks(&self, limit: usize) -> Result<Vec<Block>, ChainError> {
        let Some(head) = self.lock()?.head.clone() else {
            return Ok(Vec::new());
        };
        let span = u64::try_from(limit.max(1)).unwrap_or(u64::MAX);
        let from_slot = head.slot.saturating_sub(span.saturating_sub(1));
        let mut blocks = self.store.load_blocks(from_slot, limit.max(1))?;
        blocks.reverse();
        Ok(blocks)
    }

    /// Exports a page of blocks with their judgment records.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read.
    pub fn export(&self, from_slot: u64, limit: usize) -> Result<ExportBatch, ChainError> {
        let blocks = self.store.load_blocks(from_slot, limit.max(1))?;
        let mut judgments = Vec::new();
        for block in &blocks {
            for id in &block.judgment_ids {
                if let Some(record) = self.store.load_judgment(id)? {
                    judgments.push(record);
                }
            }
        }
        let next_slot = if blocks.len() == limit.max(1) {
            blocks.last().map(|block| block.slot.saturating_add(1))
        } else {
            None
        };
        Ok(ExportBatch {
            blocks,
            judgments,
            next_slot,
        })
    }

    /// Returns the live head pointer and queue depth.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Poisoned`] when the state mutex is poisoned.
    pub fn status(&self) -> Result<ChainStatus, ChainError> {
        let state = self.lock()?;
        Ok(ChainStatus {
            head_slot: state.head.as_ref().map(|block| block.slot),
            head_hash: state.head.as_ref().map(|block| block.hash.clone()),
            pending: state.pending.len(),
        })
    }

    /// Returns aggregate counts over the stored chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the store cannot be read.
    pub fn stats(&self) -> Result<ChainStats, ChainError> {
        let pending = self.lock()?.pending.len();
        Ok(ChainStats {
            blocks: self.store.block_count()?,
            judgments: self.store.judgment_count()?,
            pending,
            flush_threshold: self.flush_threshold,
        })
    }

    /// Locks the chain state, mapping poisoning onto [`ChainError::Poisoned`].
    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, ChainError> {
        self.state.lock().map_err(|_| ChainError::Poisoned)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the slot and previous hash the next sealed block must use.
fn next_link(head: Option<&Block>) -> (u64, HashDigest) {
    head.map_or_else(
        || (0, genesis_digest()),
        |block| (block.slot.saturating_add(1), block.hash.clone()),
    )
}

/// Checks one loaded block and records any faults.
fn check_block(
    block: &Block,
    slot: u64,
    prev_hash: Option<&HashDigest>,
    errors: &mut Vec<IntegrityFault>,
) {
    if block.slot != slot {
        errors.push(fault(
            slot,
            IntegrityFaultKind::Store,
            format!("block stored at slot {slot} reports slot {}", block.slot),
        ));
    }
    match block.expected_hash() {
        Ok(expected) => {
            if expected != block.hash {
                errors.push(fault(
                    slot,
                    IntegrityFaultKind::HashMismatch,
                    format!("stored hash {} does not match recomputed seal", block.hash.value),
                ));
            }
        }
        Err(err) => {
            errors.push(fault(slot, IntegrityFaultKind::HashMismatch, err.to_string()));
        }
    }
    if block.expected_merkle_root() != block.merkle_root {
        errors.push(fault(
            slot,
            IntegrityFaultKind::MerkleMismatch,
            "stored merkle root does not match stored judgment ids".to_string(),
        ));
    }
    if let Some(expected_prev) = prev_hash {
        if &block.prev_hash != expected_prev {
            errors.push(fault(
                slot,
                IntegrityFaultKind::PrevHashMismatch,
                format!("prev_hash {} does not link to slot {}", block.prev_hash.value, slot - 1),
            ));
        }
    } else if slot == 0 && block.prev_hash.value != GENESIS_PREV_HASH {
        errors.push(fault(
            slot,
            IntegrityFaultKind::PrevHashMismatch,
            "slot zero must link to the genesis value".to_string(),
        ));
    }
}

/// Builds one integrity fault.
fn fault(slot: u64, kind: IntegrityFaultKind, detail: String) -> IntegrityFault {
    IntegrityFault {
        slot,
        kind,
        detail,
    }
}
