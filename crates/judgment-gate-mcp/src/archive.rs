// judgment-gate-mcp/src/archive.rs
// ============================================================================
// Module: In-Memory Judgment Archive
// Description: Reference implementation of the judgment archive boundary.
// Purpose: Provide archive wiring for local runs and tests.
// Dependencies: judgment-gate-core
// ============================================================================

//! ## Overview
//! The archive is an external collaborator boundary; production deployments
//! bring their own persistence with its own fallback policy. This in-memory
//! implementation exists so local runs and tests can exercise the archive
//! tool surface without one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use judgment_gate_core::ArchiveError;
use judgment_gate_core::JudgmentArchive;
use judgment_gate_core::JudgmentId;
use judgment_gate_core::JudgmentRecord;

// ============================================================================
// SECTION: In-Memory Archive
// ============================================================================

/// Archive state behind the mutex.
#[derive(Debug, Default)]
struct ArchiveState {
    /// Records keyed by identifier.
    records: BTreeMap<JudgmentId, JudgmentRecord>,
    /// Insertion order, oldest first.
    order: Vec<JudgmentId>,
}

/// In-memory judgment archive for local runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryJudgmentArchive {
    /// Archive state protected by a mutex.
    state: Mutex<ArchiveState>,
}

impl InMemoryJudgmentArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping poisoning onto an archive error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ArchiveState>, ArchiveError> {
        self.state.lock().map_err(|_| ArchiveError::Archive("archive mutex poisoned".to_string()))
    }
}

impl JudgmentArchive for InMemoryJudgmentArchive {
    fn record(&self, record: &JudgmentRecord) -> Result<(), ArchiveError> {
        let mut guard = self.lock()?;
        if !guard.records.contains_key(&record.id) {
            guard.order.push(record.id.clone());
        }
        guard.records.insert(record.id.clone(), record.clone());
        drop(guard);
        Ok(())
    }

    fn fetch(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, ArchiveError> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<JudgmentRecord>, ArchiveError> {
        let guard = self.lock()?;
        Ok(guard
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| guard.records.get(id))
            .cloned()
            .collect())
    }
}
