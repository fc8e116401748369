//! Error types for the dualstream monitor.

use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Data anomalies (empty samples, non-finite values, degenerate columns) never
/// produce an error; they degrade to neutral results inside the detectors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any processing started
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// An alert could not be delivered to its sink
    #[error("Alert sink error: {0}")]
    Sink(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parse failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}
