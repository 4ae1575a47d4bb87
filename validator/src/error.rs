//! Validator error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for validator operations.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Errors raised by configuration and the cluster collaborators.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("in-cluster configuration unavailable: {0}")]
    InCluster(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kubernetes API request failed: {0}")]
    Transport(String),

    #[error("kubernetes API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode kubernetes API response: {0}")]
    Decode(String),

    #[error("key '{key}' not found in secret {namespace}/{name}")]
    SecretKeyMissing {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("license token is empty")]
    EmptyToken,
}
