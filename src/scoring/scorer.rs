use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::constants::NEUTRAL_SCORE;
use crate::embedding::{Embedding, EmbeddingError};

use super::error::ScoringError;
use super::similarity::topical_similarity;
use super::types::{Grammar, Side};

struct ContextSlot {
    context: String,
    embedding: Result<Embedding, EmbeddingError>,
}

/// Similarity scorer with a one-entry cache for the most recent context.
///
/// Scorers created from the same [`EmbeddingCache`] share its entries and oracle
/// but each keeps its own last-context slot.
pub struct SimilarityScorer {
    cache: Arc<EmbeddingCache>,
    last_context: Mutex<Option<ContextSlot>>,
}

impl std::fmt::Debug for SimilarityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityScorer")
            .field("cache", &self.cache)
            .field("last_context", &self.last_context())
            .finish()
    }
}

impl SimilarityScorer {
    pub fn new(cache: Arc<EmbeddingCache>) -> Self {
        Self {
            cache,
            last_context: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Returns the context currently held in the one-entry slot.
    pub fn last_context(&self) -> Option<String> {
        self.last_context
            .lock()
            .as_ref()
            .map(|slot| slot.context.clone())
    }

    /// Scores `word` against `context`, reporting why no signal was available.
    ///
    /// Both embeddings are always resolved, even when the context has none.
    pub fn score(&self, context: &str, word: &str) -> Result<f32, ScoringError> {
        let context_embedding = self.resolve_context(context);
        let word_embedding = self.cache.try_get_embedding(word);

        let context_embedding = context_embedding.map_err(|source| ScoringError::Embedding {
            side: Side::Context,
            source,
        })?;
        let word_embedding = word_embedding.map_err(|source| ScoringError::Embedding {
            side: Side::Word,
            source,
        })?;

        if context_embedding.dim() != word_embedding.dim() {
            return Err(ScoringError::DimensionMismatch {
                context_dim: context_embedding.dim(),
                word_dim: word_embedding.dim(),
            });
        }

        Ok(topical_similarity(&context_embedding, &word_embedding))
    }

    fn resolve_context(&self, context: &str) -> Result<Embedding, EmbeddingError> {
        let mut slot = self.last_context.lock();
        if let Some(held) = slot.as_ref().filter(|held| held.context == context) {
            return held.embedding.clone();
        }

        let embedding = self.cache.try_get_embedding(context);
        *slot = Some(ContextSlot {
            context: context.to_string(),
            embedding: embedding.clone(),
        });
        embedding
    }
}

impl Grammar for SimilarityScorer {
    fn query(&self, context: &str, word: &str, _is_rear: bool) -> f64 {
        let started = Instant::now();

        let score = match self.score(context, word) {
            Ok(score) => f64::from(score),
            Err(e) => {
                debug!(error = %e, "No similarity signal, using neutral score");
                NEUTRAL_SCORE
            }
        };

        debug!(
            context = %context,
            word = %word,
            score,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Similarity query"
        );

        score
    }
}
