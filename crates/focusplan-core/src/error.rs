//! Core error types for focusplan-core.
//!
//! The planning engines never fail: insufficient data degrades to BOOT and
//! bad configuration is clamped. Errors only exist at the I/O edges --
//! configuration files, the persisted planner state and the history file.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planner state persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Session history errors
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Planner state persistence errors.
#[derive(Error, Debug)]
pub enum StateError {
    /// State file path has no parent directory to stage the write in
    #[error("State path {0} has no parent directory")]
    NoParent(PathBuf),

    /// Writing or renaming the staged state file failed
    #[error("Failed to persist planner state to {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the state failed
    #[error("Failed to encode planner state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Session history errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// History file could not be read
    #[error("Failed to read history from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appending a record failed
    #[error("Failed to append to history at {path}: {source}")]
    AppendFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
