// judgment-gate-config/src/config.rs
// ============================================================================
// Module: Judgment Gate Configuration
// Description: Configuration loading and validation for the Judgment Gate server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: judgment-gate-core, judgment-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Invalid configuration fails closed; the server refuses to boot rather than
//! guessing. A missing file at the default location yields defaults (stdio
//! transport, in-memory ledger); a missing file at an explicit path is an
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use judgment_gate_core::runtime::chain::DEFAULT_FLUSH_THRESHOLD;
use judgment_gate_store_sqlite::SqliteJournalMode;
use judgment_gate_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "judgment-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "JUDGMENT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length for configured paths.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default server name advertised during initialization.
const DEFAULT_SERVER_NAME: &str = "judgment-gate";
/// Server version advertised during initialization.
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// Wire transport the server binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Line-delimited JSON-RPC over stdin/stdout for one long-lived client.
    #[default]
    Stdio,
    /// HTTP with health, SSE, and message routes for many clients.
    Http,
}

/// Server transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Wire transport to serve.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address, required for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Server name advertised during initialization.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

/// Returns the default request body cap.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default advertised server name.
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

/// Returns the advertised server version.
#[must_use]
pub const fn server_version() -> &'static str {
    SERVER_VERSION
}

// ============================================================================
// SECTION: Ledger Config
// ============================================================================

/// Ledger store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStoreType {
    /// In-memory store; chain state dies with the process.
    #[default]
    Memory,
    /// Durable `SQLite` store.
    Sqlite,
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Ledger store backend.
    #[serde(default)]
    pub store: LedgerStoreType,
    /// Database path, required for the `SQLite` store.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Pending-judgment count that triggers an automatic flush.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store: LedgerStoreType::Memory,
            path: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }
}

/// Returns the default auto-flush threshold.
const fn default_flush_threshold() -> usize {
    DEFAULT_FLUSH_THRESHOLD
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Guard Config
// ============================================================================

/// Guard orchestration configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Whether the pre-check runs at all; disabled skips straight to the
    /// handler.
    #[serde(default = "default_guard_enabled")]
    pub enabled: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// Returns the default guard toggle.
const fn default_guard_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the Judgment Gate server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JudgmentGateConfig {
    /// Server transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Guard configuration.
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

impl JudgmentGateConfig {
    /// Loads configuration from the given path, the `JUDGMENT_GATE_CONFIG`
    /// environment variable, or the default filename, in that order.
    ///
    /// A missing file at the default location yields defaults; a missing file
    /// at an explicitly requested path is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
        let (resolved, explicit) = match (path, env_path) {
            (Some(path), _) => (path.to_path_buf(), true),
            (None, Some(path)) => (path, true),
            (None, None) => (PathBuf::from(DEFAULT_CONFIG_NAME), false),
        };
        if !resolved.exists() {
            if explicit {
                return Err(ConfigError::Io(format!(
                    "config file not found: {}",
                    resolved.display()
                )));
            }
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let metadata =
            fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if usize::try_from(metadata.len()).unwrap_or(usize::MAX) > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let contents =
            fs::read_to_string(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: Self =
            toml::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, failing closed on any inconsistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a setting is out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.is_empty() {
            return Err(ConfigError::Invalid("server.name must not be empty".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        match self.server.transport {
            ServerTransport::Http => {
                let Some(bind) = self.server.bind.as_ref() else {
                    return Err(ConfigError::Invalid(
                        "server.bind is required for the http transport".to_string(),
                    ));
                };
                if bind.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::Invalid(format!(
                        "server.bind is not a valid socket address: {bind}"
                    )));
                }
            }
            ServerTransport::Stdio => {}
        }
        if self.ledger.flush_threshold == 0 {
            return Err(ConfigError::Invalid(
                "ledger.flush_threshold must be at least 1".to_string(),
            ));
        }
        match self.ledger.store {
            LedgerStoreType::Sqlite => {
                let Some(path) = self.ledger.path.as_ref() else {
                    return Err(ConfigError::Invalid(
                        "ledger.path is required for the sqlite store".to_string(),
                    ));
                };
                if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
                    return Err(ConfigError::Invalid(
                        "ledger.path exceeds length limit".to_string(),
                    ));
                }
            }
            LedgerStoreType::Memory => {}
        }
        Ok(())
    }
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
        reason = "Test-only configuration assertions."
    )]

    use super::JudgmentGateConfig;
    use super::LedgerStoreType;
    use super::ServerTransport;

    #[test]
    fn defaults_are_valid() {
        let config = JudgmentGateConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.transport, ServerTransport::Stdio);
        assert_eq!(config.ledger.store, LedgerStoreType::Memory);
        assert_eq!(config.ledger.flush_threshold, 10);
        assert!(config.guard.enabled);
    }

    #[test]
    fn http_transport_requires_bind() {
        let config: JudgmentGateConfig =
            toml::from_str("[server]\ntransport = \"http\"\n").unwrap();
        assert!(config.validate().is_err());
        let config: JudgmentGateConfig =
            toml::from_str("[server]\ntransport = \"http\"\nbind = \"127.0.0.1:8780\"\n").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn sqlite_store_requires_path() {
        let config: JudgmentGateConfig = toml::from_str("[ledger]\nstore = \"sqlite\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_flush_threshold_is_rejected() {
        let config: JudgmentGateConfig =
            toml::from_str("[ledger]\nflush_threshold = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = toml::from_str::<JudgmentGateConfig>("[server]\nsurprise = true\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("judgment-gate.toml");
        std::fs::write(&path, "[server]\nname = \"gate-test\"\n[ledger]\nflush_threshold = 3\n")
            .unwrap();
        let config = JudgmentGateConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.name, "gate-test");
        assert_eq!(config.ledger.flush_threshold, 3);
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(JudgmentGateConfig::load(Some(&missing)).is_err());
    }
}
