use thiserror::Error;

use crate::embedding::{EmbeddingError, EmbeddingErrorKind};

use super::types::Side;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("no {side} embedding: {source}")]
    Embedding {
        side: Side,
        #[source]
        source: EmbeddingError,
    },

    #[error("embedding dimensions differ: context {context_dim}, word {word_dim}")]
    DimensionMismatch { context_dim: usize, word_dim: usize },
}

impl ScoringError {
    /// Returns the failing side and failure class for embedding errors.
    pub fn embedding_failure(&self) -> Option<(Side, EmbeddingErrorKind)> {
        match self {
            ScoringError::Embedding { side, source } => Some((*side, source.kind())),
            ScoringError::DimensionMismatch { .. } => None,
        }
    }
}
