//! Test fixtures for integration tests.

use std::sync::Arc;

use topical::cache::EmbeddingCache;
use topical::embedding::{MockOracle, MockOracleProbe, OracleHandle};
use topical::scoring::SimilarityScorer;

pub const FIXTURE_DIM: usize = 3;

/// Three-word vocabulary: "cat" and "dog" are close, "car" is orthogonal to both.
pub fn animal_oracle() -> MockOracle {
    MockOracle::new(FIXTURE_DIM)
        .with_embedding("cat", vec![1.0, 0.0, 0.0])
        .with_embedding("dog", vec![0.9, 0.1, 0.0])
        .with_embedding("car", vec![0.0, 0.0, 1.0])
}

pub struct Harness {
    pub oracle: Arc<OracleHandle>,
    pub cache: Arc<EmbeddingCache>,
    pub scorer: SimilarityScorer,
    pub probe: MockOracleProbe,
}

impl Harness {
    pub fn new(oracle: MockOracle) -> Self {
        Self::with_limit(oracle, topical::CACHE_LIMIT)
    }

    pub fn with_limit(oracle: MockOracle, limit: usize) -> Self {
        let probe = oracle.probe();
        let oracle = Arc::new(OracleHandle::new(oracle));
        let cache = Arc::new(EmbeddingCache::with_limit(Arc::clone(&oracle), limit));
        let scorer = cache.scorer();
        Self {
            oracle,
            cache,
            scorer,
            probe,
        }
    }
}

/// Candidate words for a context, in the order a host would submit them.
pub fn candidate_words(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("candidate-{}", i)).collect()
}
