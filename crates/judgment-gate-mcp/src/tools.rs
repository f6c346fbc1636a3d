// judgment-gate-mcp/src/tools.rs
// ============================================================================
// Module: Built-in Tool Factories
// Description: Ledger, judgment, and archive tool factories.
// Purpose: Expose thin tool wrappers over the chain and its collaborators.
// Dependencies: judgment-gate-core, async-trait, serde, serde_json
// ============================================================================

//! ## Overview
//! The factories here cover the control plane's own surface: the ledger
//! operations, the judgment-producing `judge` tool, and archive reads.
//! Domain tools (search, digest, codebase analysis) register through the
//! same [`ToolFactory`] contract from outside this crate. Every handler is a
//! thin wrapper over a core operation; policy stays in the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use judgment_gate_core::Chain;
use judgment_gate_core::ChainError;
use judgment_gate_core::JudgmentArchive;
use judgment_gate_core::JudgmentEngine;
use judgment_gate_core::Timestamp;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::now_unix_millis;
use crate::registry::CollaboratorKey;
use crate::registry::Collaborators;
use crate::registry::ToolBuildError;
use crate::registry::ToolError;
use crate::registry::ToolFactory;
use crate::registry::ToolSpec;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default page size for list-style tools.
const DEFAULT_LIST_LIMIT: usize = 10;
/// Maximum page size for list-style tools.
const MAX_LIST_LIMIT: usize = 100;

// ============================================================================
// SECTION: Ledger Factory
// ============================================================================

/// Ledger operation selector for the shared handler.
#[derive(Debug, Clone, Copy)]
enum LedgerOp {
    /// Head pointer and queue depth.
    Status,
    /// Integrity walk over stored blocks.
    Verify,
    /// Current head block.
    Head,
    /// One block by slot.
    Block,
    /// Most recent blocks.
    Recent,
    /// Aggregate counts.
    Stats,
    /// Paged export of blocks and judgments.
    Export,
    /// Seal the pending queue into a block.
    Flush,
    /// Repair half-stamped judgments.
    Relink,
    /// Fold fully orphaned judgments into a recovery block.
    Adopt,
    /// Destroy all chain state (exact confirmation required).
    Reset,
}

/// Shared handler dispatching one ledger operation.
struct LedgerToolHandler {
    /// The chain every operation runs against.
    chain: Arc<Chain>,
    /// Selected operation.
    op: LedgerOp,
}

/// `ledger_verify` parameters.
#[derive(Debug, Default, Deserialize)]
struct VerifyParams {
    /// Slot to start the walk from.
    #[serde(default)]
    from_slot: u64,
}

/// `ledger_block` parameters.
#[derive(Debug, Deserialize)]
struct BlockParams {
    /// Slot of the block to fetch.
    number: u64,
}

/// `ledger_recent` parameters.
#[derive(Debug, Default, Deserialize)]
struct RecentParams {
    /// Maximum number of blocks to return.
    #[serde(default)]
    limit: Option<usize>,
}

/// `ledger_export` parameters.
#[derive(Debug, Default, Deserialize)]
struct ExportParams {
    /// Slot to export from.
    #[serde(default)]
    from_block: u64,
    /// Maximum number of blocks to export.
    #[serde(default)]
    limit: Option<usize>,
}

/// `ledger_reset` parameters.
#[derive(Debug, Default, Deserialize)]
struct ResetParams {
    /// Confirmation phrase; must match the reset literal exactly.
    #[serde(default)]
    confirm: String,
}

#[async_trait::async_trait]
impl crate::registry::ToolHandler for LedgerToolHandler {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let now = Timestamp::from_unix_millis(now_unix_millis());
        match self.op {
            LedgerOp::Status => encode(&self.chain.status().map_err(ledger_error)?),
            LedgerOp::Verify => {
                let params: VerifyParams = decode(arguments)?;
                encode(&self.chain.verify_integrity(params.from_slot))
            }
            LedgerOp::Head => {
                let head = self.chain.head().map_err(ledger_error)?;
                Ok(json!({"head": head}))
            }
            LedgerOp::Block => {
                let params: BlockParams = decode(arguments)?;
                let block = self.chain.block(params.number).map_err(ledger_error)?;
                Ok(json!({"block": block}))
            }
            LedgerOp::Recent => {
                let params: RecentParams = decode(arguments)?;
                let limit = clamp_limit(params.limit);
                let blocks = self.chain.recent_blocks(limit).map_err(ledger_error)?;
                Ok(json!({"blocks": blocks}))
            }
            LedgerOp::Stats => encode(&self.chain.stats().map_err(ledger_error)?),
            LedgerOp::Export => {
                let params: ExportParams = decode(arguments)?;
                let limit = clamp_limit(params.limit);
                encode(&self.chain.export(params.from_block, limit).map_err(ledger_error)?)
            }
            LedgerOp::Flush => encode(&self.chain.flush(now).map_err(ledger_error)?),
            LedgerOp::Relink => {
                encode(&self.chain.relink_orphaned_judgments().map_err(ledger_error)?)
            }
            LedgerOp::Adopt => {
                encode(&self.chain.adopt_orphaned_judgments(now).map_err(ledger_error)?)
            }
            LedgerOp::Reset => {
                let params: ResetParams = decode(arguments)?;
                self.chain.reset_all(&params.confirm).map_err(ledger_error)?;
                Ok(json!({"reset": true}))
            }
        }
    }
}

/// Factory for the ledger tool family.
pub struct LedgerToolFactory;

impl ToolFactory for LedgerToolFactory {
    fn name(&self) -> &str {
        "ledger"
    }

    fn domain(&self) -> &str {
        "chain"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        BTreeSet::from([CollaboratorKey::Ledger])
    }

    fn create(&self, collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        let chain = collaborators
            .ledger
            .clone()
            .ok_or_else(|| ToolBuildError::Factory("ledger collaborator missing".to_string()))?;
        let entries: [(&str, &str, LedgerOp, Value); 11] = [
            (
                "ledger_status",
                "Current head pointer and pending-queue depth.",
                LedgerOp::Status,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_verify",
                "Walk the chain recomputing hashes and Merkle roots; reports faults.",
                LedgerOp::Verify,
                object_schema(
                    json!({"from_slot": integer_schema("Slot to start from (default 0).")}),
                    &[],
                ),
            ),
            (
                "ledger_head",
                "Fetch the current head block.",
                LedgerOp::Head,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_block",
                "Fetch one block by slot number.",
                LedgerOp::Block,
                object_schema(json!({"number": integer_schema("Block slot to fetch.")}), &[
                    "number",
                ]),
            ),
            (
                "ledger_recent",
                "Fetch the most recent blocks, newest first.",
                LedgerOp::Recent,
                object_schema(
                    json!({"limit": integer_schema("Maximum blocks to return (default 10).")}),
                    &[],
                ),
            ),
            (
                "ledger_stats",
                "Aggregate block and judgment counts.",
                LedgerOp::Stats,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_export",
                "Export a page of blocks with their judgment records.",
                LedgerOp::Export,
                object_schema(
                    json!({
                        "from_block": integer_schema("Slot to export from (default 0)."),
                        "limit": integer_schema("Maximum blocks to export (default 10).")
                    }),
                    &[],
                ),
            ),
            (
                "ledger_flush",
                "Seal every pending judgment into the next block.",
                LedgerOp::Flush,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_relink",
                "Repair judgments referenced by a block but missing their stamps.",
                LedgerOp::Relink,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_adopt",
                "Fold judgments referenced by no block into a recovery block.",
                LedgerOp::Adopt,
                object_schema(json!({}), &[]),
            ),
            (
                "ledger_reset",
                "Destroy all chain state. Requires the exact confirmation phrase.",
                LedgerOp::Reset,
                object_schema(
                    json!({"confirm": string_schema("Exact confirmation phrase.")}),
                    &["confirm"],
                ),
            ),
        ];
        Ok(entries
            .into_iter()
            .map(|(name, description, op, schema)| ToolSpec {
                name: name.to_string(),
                description: description.to_string(),
                input_schema: schema,
                handler: Arc::new(LedgerToolHandler {
                    chain: Arc::clone(&chain),
                    op,
                }),
            })
            .collect())
    }
}

// ============================================================================
// SECTION: Judgment Factory
// ============================================================================

/// Handler invoking the injected scoring engine.
struct JudgeToolHandler {
    /// Scoring collaborator.
    engine: Arc<dyn JudgmentEngine>,
}

/// `judge` parameters.
#[derive(Debug, Deserialize)]
struct JudgeParams {
    /// Item to score.
    item: Value,
    /// Optional scoring context.
    #[serde(default)]
    context: Value,
}

#[async_trait::async_trait]
impl crate::registry::ToolHandler for JudgeToolHandler {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: JudgeParams = decode(arguments)?;
        let outcome = self
            .engine
            .judge(&params.item, &params.context)
            .map_err(|err| ToolError::Handler(err.to_string()))?;
        serde_json::to_value(outcome).map_err(|_| ToolError::Serialization)
    }
}

/// Factory for the judgment-producing `judge` tool.
pub struct JudgmentToolFactory;

impl ToolFactory for JudgmentToolFactory {
    fn name(&self) -> &str {
        "judgment"
    }

    fn domain(&self) -> &str {
        "scoring"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        BTreeSet::from([CollaboratorKey::Judge, CollaboratorKey::Ledger])
    }

    fn create(&self, collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        let engine = collaborators
            .judge
            .clone()
            .ok_or_else(|| ToolBuildError::Factory("judge collaborator missing".to_string()))?;
        Ok(vec![ToolSpec {
            name: "judge".to_string(),
            description: "Score one item; the verdict is recorded in the ledger.".to_string(),
            input_schema: object_schema(
                json!({
                    "item": any_schema("Item to score."),
                    "context": any_schema("Optional scoring context.")
                }),
                &["item"],
            ),
            handler: Arc::new(JudgeToolHandler {
                engine,
            }),
        }])
    }
}

// ============================================================================
// SECTION: Archive Factory
// ============================================================================

/// Handler reading the external judgment archive.
struct ArchiveRecentHandler {
    /// Archive collaborator.
    archive: Arc<dyn JudgmentArchive>,
}

#[async_trait::async_trait]
impl crate::registry::ToolHandler for ArchiveRecentHandler {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: RecentParams = decode(arguments)?;
        let limit = clamp_limit(params.limit);
        let judgments = self
            .archive
            .recent(limit)
            .map_err(|err| ToolError::Handler(err.to_string()))?;
        Ok(json!({"judgments": judgments}))
    }
}

/// Factory for archive read tools.
pub struct ArchiveToolFactory;

impl ToolFactory for ArchiveToolFactory {
    fn name(&self) -> &str {
        "archive"
    }

    fn domain(&self) -> &str {
        "history"
    }

    fn requires(&self) -> BTreeSet<CollaboratorKey> {
        BTreeSet::from([CollaboratorKey::Archive])
    }

    fn create(&self, collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError> {
        let archive = collaborators
            .archive
            .clone()
            .ok_or_else(|| ToolBuildError::Factory("archive collaborator missing".to_string()))?;
        Ok(vec![ToolSpec {
            name: "judgment_recent".to_string(),
            description: "Fetch the most recent archived judgments.".to_string(),
            input_schema: object_schema(
                json!({"limit": integer_schema("Maximum judgments to return (default 10).")}),
                &[],
            ),
            handler: Arc::new(ArchiveRecentHandler {
                archive,
            }),
        }])
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes tool parameters, treating a null payload as an empty object.
fn decode<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Maps a chain error onto the tool error space.
fn ledger_error(err: ChainError) -> ToolError {
    ToolError::Ledger(err.to_string())
}

/// Encodes a serializable result as a JSON value.
fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|_| ToolError::Serialization)
}

/// Clamps an optional list limit into `[1, MAX_LIST_LIMIT]`.
fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Builds an object schema with the given properties and required keys.
fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Builds a string property schema.
fn string_schema(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// Builds an integer property schema.
fn integer_schema(description: &str) -> Value {
    json!({"type": "integer", "description": description})
}

/// Builds an any-typed property schema.
fn any_schema(description: &str) -> Value {
    json!({"description": description})
}
