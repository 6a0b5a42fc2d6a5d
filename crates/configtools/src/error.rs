//! Error types for configuration resolution and logging side effects.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while resolving configuration or applying logging changes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The bundled default resource is missing or unreadable. Fatal at
    /// construction: the version key and the default-fallback source both
    /// depend on it.
    #[error("default configuration resource unavailable: {0}")]
    MissingDefaultConfiguration(String),
    /// A configuration file exists but could not be copied or read.
    #[error("failed to load configuration file {path}: {source}")]
    FileLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A required key has no value in any applicable source.
    #[error("required configuration parameter {0} not found")]
    RequiredKeyMissing(String),
    /// A present value could not be parsed into the requested type.
    #[error("invalid value {value:?} for configuration parameter {key}: {message}")]
    Parse {
        key: String,
        value: String,
        message: String,
    },
    /// An override was attempted for a key that can never be overridden.
    #[error("cannot override {0} parameter")]
    InvalidOverride(String),
    /// The log sink could not apply a requested change.
    #[error("logging configuration failed: {0}")]
    Logging(String),
}
