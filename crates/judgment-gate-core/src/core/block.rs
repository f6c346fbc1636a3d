// judgment-gate-core/src/core/block.rs
// ============================================================================
// Module: Judgment Gate Block Model
// Description: Immutable, hash-linked blocks batching judgment references.
// Purpose: Provide the sealed block structure and its hash computation.
// Dependencies: serde, crate::core::{hashing, identifiers, merkle, time}
// ============================================================================

//! ## Overview
//! A block batches the ordered judgment ids pending at flush time. Its hash
//! covers the slot, the previous block hash, the Merkle root over the
//! judgment ids, the judgment count, and the seal timestamp; nothing else.
//! Blocks are immutable once written; verification recomputes the seal hash
//! and the Merkle root from stored fields and compares.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::JudgmentId;
use crate::core::merkle::merkle_root_of_ids;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when sealing a block.
#[derive(Debug, Error)]
pub enum BlockSealError {
    /// Canonical hashing of the seal input failed.
    #[error("block seal hashing failed: {0}")]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Block
// ============================================================================

/// One sealed block in the proof-of-judgment chain.
///
/// # Invariants
/// - `hash` equals the canonical hash of the seal input
///   `(slot, prev_hash, merkle_root, judgment_count, timestamp)`.
/// - `merkle_root` covers `judgment_ids` in stored order.
/// - Blocks never change after they are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Monotonically increasing slot, starting at zero.
    pub slot: u64,
    /// Seal hash for this block.
    pub hash: HashDigest,
    /// Hash of the previous block, or the genesis value at slot zero.
    pub prev_hash: HashDigest,
    /// Merkle root over the judgment ids in append order.
    pub merkle_root: HashDigest,
    /// Ordered judgment ids batched into this block.
    pub judgment_ids: Vec<JudgmentId>,
    /// Number of judgments batched into this block.
    pub judgment_count: u64,
    /// Seal timestamp supplied by the host.
    pub timestamp: Timestamp,
}

/// Canonical seal input hashed to produce a block hash.
#[derive(Serialize)]
struct SealInput<'a> {
    /// Block slot.
    slot: u64,
    /// Previous block hash.
    prev_hash: &'a HashDigest,
    /// Merkle root over the judgment ids.
    merkle_root: &'a HashDigest,
    /// Number of judgments in the block.
    judgment_count: u64,
    /// Seal timestamp.
    timestamp: Timestamp,
}

impl Block {
    /// Seals a new block over the supplied judgment ids.
    ///
    /// # Errors
    ///
    /// Returns [`BlockSealError`] when canonical hashing fails.
    pub fn seal(
        slot: u64,
        prev_hash: HashDigest,
        judgment_ids: Vec<JudgmentId>,
        timestamp: Timestamp,
    ) -> Result<Self, BlockSealError> {
        let merkle_root = merkle_root_of_ids(&judgment_ids);
        let judgment_count = u64::try_from(judgment_ids.len()).unwrap_or(u64::MAX);
        let hash = seal_hash(slot, &prev_hash, &merkle_root, judgment_count, timestamp)?;
        Ok(Self {
            slot,
            hash,
            prev_hash,
            merkle_root,
            judgment_ids,
            judgment_count,
            timestamp,
        })
    }

    /// Recomputes the seal hash from the stored block fields.
    ///
    /// # Errors
    ///
    /// Returns [`BlockSealError`] when canonical hashing fails.
    pub fn expected_hash(&self) -> Result<HashDigest, BlockSealError> {
        seal_hash(self.slot, &self.prev_hash, &self.merkle_root, self.judgment_count, self.timestamp)
    }

    /// Recomputes the Merkle root from the stored judgment ids.
    #[must_use]
    pub fn expected_merkle_root(&self) -> HashDigest {
        merkle_root_of_ids(&self.judgment_ids)
    }
}

/// Hashes the canonical seal input for a block.
fn seal_hash(
    slot: u64,
    prev_hash: &HashDigest,
    merkle_root: &HashDigest,
    judgment_count: u64,
    timestamp: Timestamp,
) -> Result<HashDigest, BlockSealError> {
    let input = SealInput {
        slot,
        prev_hash,
        merkle_root,
        judgment_count,
        timestamp,
    };
    Ok(hash_canonical_json(DEFAULT_HASH_ALGORITHM, &input)?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only block assertions."
    )]

    use super::Block;
    use crate::core::hashing::genesis_digest;
    use crate::core::identifiers::JudgmentId;
    use crate::core::time::Timestamp;

    #[test]
    fn seal_hash_matches_recomputation() {
        let block = Block::seal(
            0,
            genesis_digest(),
            vec![JudgmentId::new("j1"), JudgmentId::new("j2")],
            Timestamp::from_unix_millis(42),
        )
        .expect("seal");
        assert_eq!(block.hash, block.expected_hash().expect("recompute"));
        assert_eq!(block.merkle_root, block.expected_merkle_root());
        assert_eq!(block.judgment_count, 2);
    }

    #[test]
    fn tampered_judgment_set_changes_expected_merkle_root() {
        let mut block = Block::seal(
            0,
            genesis_digest(),
            vec![JudgmentId::new("j1"), JudgmentId::new("j2")],
            Timestamp::from_unix_millis(42),
        )
        .expect("seal");
        block.judgment_ids.push(JudgmentId::new("j3"));
        assert_ne!(block.merkle_root, block.expected_merkle_root());
    }

    #[test]
    fn different_timestamps_produce_different_hashes() {
        let ids = vec![JudgmentId::new("j1")];
        let first = Block::seal(0, genesis_digest(), ids.clone(), Timestamp::from_unix_millis(1))
            .expect("seal");
        let second =
            Block::seal(0, genesis_digest(), ids, Timestamp::from_unix_millis(2)).expect("seal");
        assert_ne!(first.hash, second.hash);
    }
}
