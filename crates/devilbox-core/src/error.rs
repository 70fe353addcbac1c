//! Error types for Devilbox configuration handling.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while reading or updating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key {0:?}: keys must be non-empty and contain no '=' or whitespace")]
    InvalidKey(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
