// judgment-gate-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Dependency-gated tool factories and the callable catalog.
// Purpose: Turn heterogeneous capability providers into a uniform catalog.
// Dependencies: async-trait, serde, serde_json, judgment-gate-core
// ============================================================================

//! ## Overview
//! Factories declare the collaborators they require; the registry builds the
//! final catalog by instantiating every factory whose requirements are
//! satisfied and skipping the rest with a diagnostic. Registry construction
//! is total: a failing factory is logged and skipped, never fatal. Both
//! factory names and tool names follow a documented last-wins policy on
//! duplicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use judgment_gate_core::Chain;
use judgment_gate_core::JudgmentArchive;
use judgment_gate_core::JudgmentEngine;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::GateAuditSink;
use crate::audit::RegistryAuditEvent;
use crate::audit::now_unix_millis;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool invocation errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("unknown tool")]
    UnknownTool,
    /// The arguments payload failed to decode.
    #[error("invalid tool params: {0}")]
    InvalidParams(String),
    /// The pre-check vetoed the invocation.
    #[error("blocked by {blocked_by}: {reason}")]
    GuardBlocked {
        /// Identity of the blocking subsystem.
        blocked_by: String,
        /// Human-readable block reason.
        reason: String,
    },
    /// The tool handler failed.
    #[error("{0}")]
    Handler(String),
    /// A ledger operation inside a handler failed.
    #[error("ledger error: {0}")]
    Ledger(String),
    /// Result serialization failed.
    #[error("serialization failed")]
    Serialization,
}

/// Errors raised when a factory fails to build its tools.
#[derive(Debug, Error)]
pub enum ToolBuildError {
    /// The factory could not construct its tools.
    #[error("tool factory failed: {0}")]
    Factory(String),
}

/// Errors raised when registering a factory.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The factory reported an empty name.
    #[error("factory name must not be empty")]
    UnnamedFactory,
}

// ============================================================================
// SECTION: Tool Specs
// ============================================================================

/// Invocable tool capability.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the invocation fails.
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Shared tool handler reference.
pub type SharedToolHandler = Arc<dyn ToolHandler>;

/// Tool definition advertised through `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema describing the arguments object.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One registered tool: its definition plus its handler.
#[derive(Clone)]
pub struct ToolSpec {
    /// Unique, stable tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema describing the arguments object.
    pub input_schema: Value,
    /// Capability invoked by the guarded pipeline.
    pub handler: SharedToolHandler,
}

impl ToolSpec {
    /// Returns the advertised definition for this tool.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Keys naming the collaborators a factory may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CollaboratorKey {
    /// The proof-of-judgment chain.
    Ledger,
    /// The opaque scoring engine.
    Judge,
    /// The external judgment persistence boundary.
    Archive,
}

impl CollaboratorKey {
    /// Returns a stable label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Judge => "judge",
            Self::Archive => "archive",
        }
    }
}

/// Bag of optional collaborators supplied to factory construction.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// The proof-of-judgment chain, when available.
    pub ledger: Option<Arc<Chain>>,
    /// The scoring engine, when available.
    pub judge: Option<Arc<dyn JudgmentEngine>>,
    /// The judgment archive, when available.
    pub archive: Option<Arc<dyn JudgmentArchive>>,
}

impl Collaborators {
    /// Returns true when the keyed collaborator is present.
    #[must_use]
    pub fn contains(&self, key: CollaboratorKey) -> bool {
        match key {
            CollaboratorKey::Ledger => self.ledger.is_some(),
            CollaboratorKey::Judge => self.judge.is_some(),
            CollaboratorKey::Archive => self.archive.is_some(),
        }
    }

    /// Returns the required keys missing from this bag, in stable order.
    #[must_use]
    pub fn missing(&self, requires: &BTreeSet<CollaboratorKey>) -> Vec<CollaboratorKey> {
        requires.iter().copied().filter(|key| !self.contains(*key)).collect()
    }
}

// ============================================================================
// SECTION: Tool Factory
// ============================================================================

/// Factory producing tools once its required collaborators are available.
pub trait ToolFactory: Send + Sync {
    /// Unique factory name.
    fn name(&self) -> &str;

    /// Domain label for diagnostics.
    fn domain(&self) -> &str;

    /// Collaborator keys this factory requires.
    fn requires(&self) -> BTreeSet<CollaboratorKey>;

    /// Builds the factory's tools from the supplied collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ToolBuildError`] when construction fails; the registry logs
    /// and skips the factory.
    fn create(&self, collaborators: &Collaborators) -> Result<Vec<ToolSpec>, ToolBuildError>;
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Ordered collection of registered tool factories.
pub struct ToolRegistry {
    /// Factories in registration order.
    factories: Vec<Arc<dyn ToolFactory>>,
    /// Audit sink for build diagnostics.
    audit: Arc<dyn GateAuditSink>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(audit: Arc<dyn GateAuditSink>) -> Self {
        Self {
            factories: Vec::new(),
            audit,
        }
    }

    /// Registers a factory by name.
    ///
    /// Re-registering a name replaces the earlier factory in place
    /// (last-wins); this is a documented policy, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnnamedFactory`] for an empty factory name.
    pub fn register(&mut self, factory: Arc<dyn ToolFactory>) -> Result<(), RegistryError> {
        if factory.name().is_empty() {
            return Err(RegistryError::UnnamedFactory);
        }
        if let Some(existing) =
            self.factories.iter_mut().find(|entry| entry.name() == factory.name())
        {
            self.audit.registry(RegistryAuditEvent {
                event: "factory_replaced",
                timestamp_ms: now_unix_millis(),
                factory: factory.name().to_string(),
                detail: "factory re-registered under the same name (last-wins)".to_string(),
            });
            *existing = factory;
        } else {
            self.factories.push(factory);
        }
        Ok(())
    }

    /// Builds the callable catalog from every eligible factory.
    ///
    /// Construction is total: ineligible factories are skipped with a
    /// diagnostic, failing factories are logged and skipped, and a duplicate
    /// tool name overwrites the earlier entry (last-wins).
    #[must_use]
    pub fn create_all(&self, collaborators: &Collaborators) -> ToolCatalog {
        let mut tools: BTreeMap<String, ToolSpec> = BTreeMap::new();
        for factory in &self.factories {
            let missing = collaborators.missing(&factory.requires());
            if !missing.is_empty() {
                let labels: Vec<&str> =
                    missing.iter().map(|key| CollaboratorKey::as_str(*key)).collect();
                self.audit.registry(RegistryAuditEvent {
                    event: "factory_skipped",
                    timestamp_ms: now_unix_millis(),
                    factory: factory.name().to_string(),
                    detail: format!("missing collaborators: {}", labels.join(", ")),
                });
                continue;
            }
            match factory.create(collaborators) {
                Ok(specs) => {
                    for spec in specs {
                        if tools.contains_key(&spec.name) {
                            self.audit.registry(RegistryAuditEvent {
                                event: "tool_replaced",
                                timestamp_ms: now_unix_millis(),
                                factory: factory.name().to_string(),
                                detail: format!(
                                    "tool {} re-registered (last-wins)",
                                    spec.name
                                ),
                            });
                        }
                        tools.insert(spec.name.clone(), spec);
                    }
                }
                Err(err) => {
                    self.audit.registry(RegistryAuditEvent {
                        event: "factory_failed",
                        timestamp_ms: now_unix_millis(),
                        factory: factory.name().to_string(),
                        detail: err.to_string(),
                    });
                }
            }
        }
        ToolCatalog {
            tools,
        }
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true when no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Immutable, name-keyed catalog of callable tools.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    /// Tools keyed by name.
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolCatalog {
    /// Returns the tool registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Returns every advertised tool definition in name order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(ToolSpec::definition).collect()
    }

    /// Returns the number of callable tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true when the catalog holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
