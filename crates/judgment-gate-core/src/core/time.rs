// judgment-gate-core/src/core/time.rs
// ============================================================================
// Module: Judgment Gate Time Model
// Description: Canonical timestamp representation for judgments and blocks.
// Purpose: Provide deterministic, replayable time values across ledger records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Judgment Gate uses explicit time values embedded in judgment records and
//! block seals to keep replay deterministic. The core engine never reads
//! wall-clock time directly; hosts must supply timestamps when appending or
//! flushing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in judgment records and block seals.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(value: i64) -> Self {
        Self(value)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}
