// judgment-gate-core/src/core/merkle.rs
// ============================================================================
// Module: Judgment Gate Merkle Summaries
// Description: Binary Merkle tree roots over ordered judgment identifiers.
// Purpose: Summarize a block's judgment set so any single change is detectable.
// Dependencies: crate::core::hashing
// ============================================================================

//! ## Overview
//! Each block carries a Merkle root over the hashes of its judgment ids in
//! append order. The tree is binary; an odd node at any layer is paired with
//! itself. The empty set hashes to the digest of the empty byte string so an
//! empty root is still well-defined.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::JudgmentId;

// ============================================================================
// SECTION: Merkle Root
// ============================================================================

/// Computes the binary Merkle root over pre-hashed leaves in order.
///
/// Parent nodes hash the concatenated lowercase-hex values of their children.
#[must_use]
pub fn merkle_root(leaves: &[HashDigest]) -> HashDigest {
    if leaves.is_empty() {
        return hash_bytes(DEFAULT_HASH_ALGORITHM, b"");
    }
    let mut layer: Vec<HashDigest> = leaves.to_vec();
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        for pair in layer.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            let mut combined = Vec::with_capacity(left.value.len() + right.value.len());
            combined.extend_from_slice(left.value.as_bytes());
            combined.extend_from_slice(right.value.as_bytes());
            next.push(hash_bytes(DEFAULT_HASH_ALGORITHM, &combined));
        }
        layer = next;
    }
    layer.swap_remove(0)
}

/// Computes the Merkle root over judgment identifiers in append order.
#[must_use]
pub fn merkle_root_of_ids(ids: &[JudgmentId]) -> HashDigest {
    let leaves: Vec<HashDigest> =
        ids.iter().map(|id| hash_bytes(DEFAULT_HASH_ALGORITHM, id.as_str().as_bytes())).collect();
    merkle_root(&leaves)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
