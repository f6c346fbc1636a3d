// judgment-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Judgment Gate Identifiers
// Description: Canonical opaque identifiers for judgment records.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifier for judgment
//! records. Identifiers are opaque and serialize as strings. Validation is
//! handled at tool or runtime boundaries rather than within this simple
//! wrapper.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Judgment record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgmentId(String);

impl JudgmentId {
    /// Creates a new judgment identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JudgmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for JudgmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JudgmentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
