// judgment-gate-config/src/lib.rs
// ============================================================================
// Module: Judgment Gate Configuration Library
// Description: Strict configuration loading for the Judgment Gate server.
// Purpose: Expose the canonical configuration model and loaders.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and validated fail-closed before the server boots. This crate is the
//! single source of truth for every tunable the server exposes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GuardConfig;
pub use config::JudgmentGateConfig;
pub use config::LedgerConfig;
pub use config::LedgerStoreType;
pub use config::ServerConfig;
pub use config::ServerTransport;
