// judgment-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Judgment Gate In-Memory Store
// Description: Simple in-memory ledger store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of [`LedgerStore`]
//! for tests and local demos, plus the shared wrapper used to hand one store
//! to concurrent callers. Durable deployments use the SQLite store crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Block;
use crate::core::HashDigest;
use crate::core::JudgmentId;
use crate::core::JudgmentRecord;
use crate::interfaces::LedgerStore;
use crate::interfaces::LedgerStoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable state behind the in-memory store mutex.
#[derive(Debug, Default)]
struct MemoryState {
    /// Blocks keyed by slot.
    blocks: BTreeMap<u64, Block>,
    /// Judgments keyed by identifier.
    judgments: BTreeMap<JudgmentId, JudgmentRecord>,
    /// Judgment append order for deterministic pending listings.
    order: Vec<JudgmentId>,
}

/// In-memory ledger store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new in-memory ledger store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping poisoning onto a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, LedgerStoreError> {
        self.state
            .lock()
            .map_err(|_| LedgerStoreError::Store("ledger store mutex poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_judgment(&self, record: &JudgmentRecord) -> Result<(), LedgerStoreError> {
        let mut guard = self.lock()?;
        if !guard.judgments.contains_key(&record.id) {
            guard.order.push(record.id.clone());
        }
        guard.judgments.insert(record.id.clone(), record.clone());
        drop(guard);
        Ok(())
    }

    fn link_judgments(
        &self,
        ids: &[JudgmentId],
        block_number: u64,
        block_hash: &HashDigest,
    ) -> Result<u64, LedgerStoreError> {
        let mut guard = self.lock()?;
        let mut updated = 0u64;
        for id in ids {
            if let Some(record) = guard.judgments.get_mut(id) {
                record.block_number = Some(block_number);
                record.block_hash = Some(block_hash.clone());
                updated = updated.saturating_add(1);
            }
        }
        drop(guard);
        Ok(updated)
    }

    fn insert_block(&self, block: &Block) -> Result<(), LedgerStoreError> {
        self.lock()?.blocks.insert(block.slot, block.clone());
        Ok(())
    }

    fn load_block(&self, slot: u64) -> Result<Option<Block>, LedgerStoreError> {
        Ok(self.lock()?.blocks.get(&slot).cloned())
    }

    fn load_blocks(&self, from_slot: u64, limit: usize) -> Result<Vec<Block>, LedgerStoreError> {
        let guard = self.lock()?;
        Ok(guard.blocks.range(from_slot..).take(limit).map(|(_, block)| block.clone()).collect())
    }

    fn load_head(&self) -> Result<Option<Block>, LedgerStoreError> {
        Ok(self.lock()?.blocks.values().next_back().cloned())
    }

    fn load_judgment(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, LedgerStoreError> {
        Ok(self.lock()?.judgments.get(id).cloned())
    }

    fn load_pending_judgments(&self) -> Result<Vec<JudgmentRecord>, LedgerStoreError> {
        let guard = self.lock()?;
        Ok(guard
            .order
            .iter()
            .filter_map(|id| guard.judgments.get(id))
            .filter(|record| record.block_number.is_none())
            .cloned()
            .collect())
    }

    fn block_count(&self) -> Result<u64, LedgerStoreError> {
        Ok(u64::try_from(self.lock()?.blocks.len()).unwrap_or(u64::MAX))
    }

    fn judgment_count(&self) -> Result<u64, LedgerStoreError> {
        Ok(u64::try_from(self.lock()?.judgments.len()).unwrap_or(u64::MAX))
    }

    fn clear_all(&self) -> Result<(), LedgerStoreError> {
        let mut guard = self.lock()?;
        guard.blocks.clear();
        guard.judgments.clear();
        guard.order.clear();
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared ledger store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedLedgerStore {
    /// Inner store implementation.
    inner: Arc<dyn LedgerStore + Send + Sync>,
}

impl SharedLedgerStore {
    /// Wraps a ledger store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl LedgerStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn LedgerStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl LedgerStore for SharedLedgerStore {
    fn insert_judgment(&self, record: &JudgmentRecord) -> Result<(), LedgerStoreError> {
        self.inner.insert_judgment(record)
    }

    fn link_judgments(
        &self,
        ids: &[JudgmentId],
        block_number: u64,
        block_hash: &HashDigest,
    ) -> Result<u64, LedgerStoreError> {
        self.inner.link_judgments(ids, block_number, block_hash)
    }

    fn insert_block(&self, block: &Block) -> Result<(), LedgerStoreError> {
        self.inner.insert_block(block)
    }

    fn load_block(&self, slot: u64) -> Result<Option<Block>, LedgerStoreError> {
        self.inner.load_block(slot)
    }

    fn load_blocks(&self, from_slot: u64, limit: usize) -> Result<Vec<Block>, LedgerStoreError> {
        self.inner.load_blocks(from_slot, limit)
    }

    fn load_head(&self) -> Result<Option<Block>, LedgerStoreError> {
        self.inner.load_head()
    }

    fn load_judgment(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, LedgerStoreError> {
        self.inner.load_judgment(id)
    }

    fn load_pending_judgments(&self) -> Result<Vec<JudgmentRecord>, LedgerStoreError> {
        self.inner.load_pending_judgments()
    }

    fn block_count(&self) -> Result<u64, LedgerStoreError> {
        self.inner.block_count()
    }

    fn judgment_count(&self) -> Result<u64, LedgerStoreError> {
        self.inner.judgment_count()
    }

    fn clear_all(&self) -> Result<(), LedgerStoreError> {
        self.inner.clear_all()
    }
}
