//! Topical similarity scoring over a lazily loaded embedding model.
//!
//! A [`SimilarityScorer`] answers "how well does this word fit this context"
//! with the magnitude of the cosine similarity of their embeddings. Embeddings
//! come from an [`EmbeddingOracle`] (a GGUF decoder by default) behind an
//! [`OracleHandle`] that loads it on first use, and are memoized by an
//! [`EmbeddingCache`].
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let oracle = Arc::new(OracleHandle::new(GgufOracle::new(config.gguf_config())));
//! let cache = Arc::new(EmbeddingCache::with_limit(oracle, config.cache_limit));
//! let scorer = cache.scorer();
//! let score = scorer.query("the cat sat on the", "mat", false);
//! ```
//!
//! Mock oracles are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod scoring;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{Config, ConfigError};
pub use constants::{CACHE_LIMIT, NEUTRAL_SCORE};
#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockOracle, MockOracleProbe};
pub use embedding::{
    Embedding, EmbeddingError, EmbeddingErrorKind, EmbeddingOracle, GgufConfig, GgufOracle,
    OracleHandle, OracleState, PoolingMode,
};
pub use scoring::{Grammar, ScoringError, Side, SimilarityScorer, topical_similarity};
