use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure class, kept for logging and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingErrorKind {
    /// Model, tokenizer or inference context could not be created. Permanent.
    Initialization,
    /// Input produced no tokens or overflowed the context window.
    Tokenization,
    /// The encode step failed.
    Inference,
    /// No usable pooled vector came out of the encode step.
    Extraction,
}

impl EmbeddingErrorKind {
    /// Returns a short static label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Tokenization => "tokenization",
            Self::Inference => "inference",
            Self::Extraction => "extraction",
        }
    }
}

impl std::fmt::Display for EmbeddingErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("embedding model not found at path: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load embedding model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("failed to allocate inference context: {reason}")]
    ContextAllocFailed { reason: String },

    #[error("invalid model configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Initialization failed earlier; the oracle stays unavailable.
    #[error("embedding oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("embedding inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("embedding extraction failed: {reason}")]
    ExtractionFailed { reason: String },
}

impl EmbeddingError {
    /// Classifies this error.
    pub fn kind(&self) -> EmbeddingErrorKind {
        match self {
            Self::ModelNotFound { .. }
            | Self::ModelLoadFailed { .. }
            | Self::ContextAllocFailed { .. }
            | Self::InvalidConfig { .. }
            | Self::OracleUnavailable { .. } => EmbeddingErrorKind::Initialization,
            Self::TokenizationFailed { .. } => EmbeddingErrorKind::Tokenization,
            Self::InferenceFailed { .. } => EmbeddingErrorKind::Inference,
            Self::ExtractionFailed { .. } => EmbeddingErrorKind::Extraction,
        }
    }

    /// Returns `true` for failures that persist for the oracle's lifetime.
    pub fn is_permanent(&self) -> bool {
        self.kind() == EmbeddingErrorKind::Initialization
    }
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EmbeddingError {
    fn from(err: std::io::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}
