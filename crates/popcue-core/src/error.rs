//! Core error types for popcue-core.
//!
//! Most failures inside the engine are recovered locally (corrupt snapshots,
//! best-effort writes); these types exist so the recovery sites can say what
//! went wrong and so callers of the fallible edges (config, SQLite, user input)
//! get a real error.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for popcue-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Snapshot restore errors
    #[error("Restore error: {0}")]
    Restore(#[from] RestoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Simulation script errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite-backed store failed
    #[error("SQLite store failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open the store
    #[error("Failed to open session store at {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// The store rejected the write or read
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted snapshot could not be read back.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// A stored value failed to parse
    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Reading from the store failed
    #[error("Failed to read snapshot: {0}")]
    Read(#[from] StoreError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// User input rejected before any state changes.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Claim-time email did not look like an address
    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    /// Action does not apply to this popup kind
    #[error("Action '{action}' is not available on the {kind} surface")]
    UnsupportedAction { action: String, kind: String },
}

/// A simulation script line could not be parsed.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("line {line}: step at {at_ms}ms is earlier than the previous step")]
    OutOfOrder { line: usize, at_ms: u64 },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
