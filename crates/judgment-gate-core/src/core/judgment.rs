// judgment-gate-core/src/core/judgment.rs
// ============================================================================
// Module: Judgment Gate Judgment Model
// Description: Judgment records, verdicts, and scoring outcome shapes.
// Purpose: Provide the canonical judgment structures batched into blocks.
// Dependencies: serde, crate::core::{hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! A judgment record captures one scoring decision: a Q-score, a verdict, a
//! confidence, and per-axiom sub-scores. Records are born pending and are
//! stamped with their block number and block hash exactly once, when a flush
//! seals them into the chain. How the score is computed is outside the core;
//! the [`crate::interfaces::JudgmentEngine`] seam produces
//! [`JudgmentOutcome`] values and this module gives them durable form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::JudgmentId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Q-score floor for a HOWL verdict.
pub const HOWL_THRESHOLD: f64 = 82.0;
/// Q-score floor for a WAG verdict.
pub const WAG_THRESHOLD: f64 = 61.8;
/// Q-score floor for a GROWL verdict.
pub const GROWL_THRESHOLD: f64 = 38.2;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Verdict classification attached to every judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Exceptional outcome.
    Howl,
    /// Good outcome.
    Wag,
    /// Questionable outcome.
    Growl,
    /// Rejected outcome.
    Bark,
}

impl Verdict {
    /// Maps a Q-score onto its verdict band.
    #[must_use]
    pub fn from_q_score(q_score: f64) -> Self {
        if q_score >= HOWL_THRESHOLD {
            Self::Howl
        } else if q_score >= WAG_THRESHOLD {
            Self::Wag
        } else if q_score >= GROWL_THRESHOLD {
            Self::Growl
        } else {
            Self::Bark
        }
    }

    /// Returns the stable wire label for the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Howl => "HOWL",
            Self::Wag => "WAG",
            Self::Growl => "GROWL",
            Self::Bark => "BARK",
        }
    }
}

// ============================================================================
// SECTION: Judgment Outcome
// ============================================================================

/// Result shape produced by a judgment engine for one scored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentOutcome {
    /// Q-score for the judged item.
    pub q_score: f64,
    /// Verdict classification.
    pub verdict: Verdict,
    /// Engine confidence in the verdict.
    pub confidence: f64,
    /// Per-axiom sub-scores keyed by axiom name.
    #[serde(default)]
    pub axiom_scores: BTreeMap<String, f64>,
}

// ============================================================================
// SECTION: Judgment Record
// ============================================================================

/// One judgment as recorded in the ledger.
///
/// # Invariants
/// - `block_number` and `block_hash` are unset while pending and set exactly
///   once when the record is sealed into a block; they never change after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    /// Judgment identifier.
    pub id: JudgmentId,
    /// Q-score for the judged item.
    pub q_score: f64,
    /// Verdict classification.
    pub verdict: Verdict,
    /// Engine confidence in the verdict.
    pub confidence: f64,
    /// Per-axiom sub-scores keyed by axiom name.
    #[serde(default)]
    pub axiom_scores: BTreeMap<String, f64>,
    /// Creation timestamp supplied by the host.
    pub created_at: Timestamp,
    /// Slot of the block containing this judgment, when settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Hash of the block containing this judgment, when settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<HashDigest>,
}

/// Permissive view of a tool output used for judgment-shape detection.
#[derive(Debug, Deserialize)]
struct ToolOutputShape {
    /// Optional identifier supplied by the tool.
    id: Option<JudgmentId>,
    /// Q-score field; required for a judgment-shaped output.
    q_score: f64,
    /// Verdict field; required for a judgment-shaped output.
    verdict: Verdict,
    /// Confidence field; required for a judgment-shaped output.
    confidence: f64,
    /// Optional per-axiom sub-scores.
    #[serde(default)]
    axiom_scores: BTreeMap<String, f64>,
}

impl JudgmentRecord {
    /// Creates a pending record from an engine outcome.
    #[must_use]
    pub fn from_outcome(id: JudgmentId, outcome: JudgmentOutcome, created_at: Timestamp) -> Self {
        Self {
            id,
            q_score: outcome.q_score,
            verdict: outcome.verdict,
            confidence: outcome.confidence,
            axiom_scores: outcome.axiom_scores,
            created_at,
            block_number: None,
            block_hash: None,
        }
    }

    /// Recognizes a judgment-shaped tool output and normalizes it into a
    /// pending record.
    ///
    /// Returns `None` when the output does not carry the judgment fields.
    /// When the output has no `id`, one is minted deterministically from the
    /// content hash and the supplied timestamp.
    #[must_use]
    pub fn from_tool_output(output: &Value, created_at: Timestamp) -> Option<Self> {
        let shape: ToolOutputShape = serde_json::from_value(output.clone()).ok()?;
        let id = match shape.id {
            Some(id) => id,
            None => mint_judgment_id(output, created_at)?,
        };
        Some(Self {
            id,
            q_score: shape.q_score,
            verdict: shape.verdict,
            confidence: shape.confidence,
            axiom_scores: shape.axiom_scores,
            created_at,
            block_number: None,
            block_hash: None,
        })
    }

    /// Returns true while the record awaits inclusion in a block.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }
}

/// Seed structure hashed to mint an identifier for an id-less tool output.
#[derive(Serialize)]
struct MintSeed<'a> {
    /// Raw tool output being recorded.
    output: &'a Value,
    /// Host-supplied creation timestamp.
    created_at: Timestamp,
}

/// Mints a deterministic judgment identifier from output content and time.
fn mint_judgment_id(output: &Value, created_at: Timestamp) -> Option<JudgmentId> {
    let seed = MintSeed {
        output,
        created_at,
    };
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &seed).ok()?;
    let short = digest.value.get(..16)?;
    Some(JudgmentId::new(format!("jgt-{short}")))
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
        clippy::float_cmp,
        reason = "Test-only judgment assertions."
    )]

    use serde_json::json;

    use super::JudgmentRecord;
    use super::Verdict;
    use crate::core::time::Timestamp;

    #[test]
    fn verdict_bands_follow_thresholds() {
        assert_eq!(Verdict::from_q_score(95.0), Verdict::Howl);
        assert_eq!(Verdict::from_q_score(82.0), Verdict::Howl);
        assert_eq!(Verdict::from_q_score(70.0), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(61.8), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(50.0), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(38.2), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(10.0), Verdict::Bark);
    }

    #[test]
    fn verdict_serializes_as_call_name() {
        let encoded = serde_json::to_string(&Verdict::Growl).expect("encode");
        assert_eq!(encoded, "\"GROWL\"");
    }

    #[test]
    fn judgment_shape_detection_accepts_scored_output() {
        let output = json!({
            "q_score": 55.5,
            "verdict": "GROWL",
            "confidence": 0.4,
            "axiom_scores": {"consistency": 0.7},
            "note": "extra fields are fine"
        });
        let record = JudgmentRecord::from_tool_output(&output, Timestamp::from_unix_millis(1))
            .expect("judgment shaped");
        assert_eq!(record.q_score, 55.5);
        assert_eq!(record.verdict, Verdict::Growl);
        assert!(record.is_pending());
        assert!(record.id.as_str().starts_with("jgt-"));
    }

    #[test]
    fn judgment_shape_detection_rejects_plain_output() {
        let output = json!({"content": "no scoring fields"});
        assert!(JudgmentRecord::from_tool_output(&output, Timestamp::from_unix_millis(1)).is_none());
    }

    #[test]
    fn minted_ids_are_deterministic() {
        let output = json!({"q_score": 10.0, "verdict": "BARK", "confidence": 0.2});
        let now = Timestamp::from_unix_millis(7);
        let first = JudgmentRecord::from_tool_output(&output, now).expect("record");
        let second = JudgmentRecord::from_tool_output(&output, now).expect("record");
        assert_eq!(first.id, second.id);
    }
}
