//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A size knob was set to zero.
    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },

    /// The batch cannot hold a full context window.
    #[error("batch size {batch_size} is smaller than context length {context_len}")]
    BatchTooSmall {
        batch_size: usize,
        context_len: usize,
    },

    /// Pooling mode string is not one of `mean`, `last`, `cls`.
    #[error("unknown pooling mode '{value}' (expected mean, last or cls)")]
    InvalidPooling { value: String },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },
}
