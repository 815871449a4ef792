//! Text → embedding cache in front of the oracle.
//!
//! Keys are the exact input strings. When a new entry would find the map at its
//! limit, the whole map is cleared first; there is no per-entry eviction.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::stats::{CacheCounters, CacheStats};
use crate::constants::CACHE_LIMIT;
use crate::embedding::{Embedding, EmbeddingError, OracleHandle};
use crate::scoring::SimilarityScorer;

/// Bounded embedding cache; the single point of access to the oracle.
pub struct EmbeddingCache {
    oracle: Arc<OracleHandle>,
    entries: Mutex<HashMap<String, Embedding>>,
    // Held from the miss re-check through the insert, so a text is embedded once.
    fill: Mutex<()>,
    limit: usize,
    counters: CacheCounters,
}

impl EmbeddingCache {
    /// Creates a cache with the default limit of [`CACHE_LIMIT`] entries.
    pub fn new(oracle: Arc<OracleHandle>) -> Self {
        Self::with_limit(oracle, CACHE_LIMIT)
    }

    /// Creates a cache cleared whenever it would grow past `limit` entries.
    pub fn with_limit(oracle: Arc<OracleHandle>, limit: usize) -> Self {
        Self {
            oracle,
            entries: Mutex::new(HashMap::new()),
            fill: Mutex::new(()),
            limit: limit.max(1),
            counters: CacheCounters::default(),
        }
    }

    /// Returns the embedding of `text`, computing and caching it on a miss.
    ///
    /// Failures are never cached.
    pub fn try_get_embedding(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if let Some(hit) = self.lookup(text) {
            return Ok(hit);
        }

        let _fill = self.fill.lock();
        if let Some(hit) = self.lookup(text) {
            return Ok(hit);
        }

        self.counters.miss();
        let embedding = match self.oracle.embed(text) {
            Ok(vector) => Embedding::from(vector),
            Err(e) => {
                self.counters.failure();
                return Err(e);
            }
        };

        let mut entries = self.entries.lock();
        if !entries.contains_key(text) && entries.len() >= self.limit {
            debug!(limit = self.limit, "Embedding cache full, clearing");
            entries.clear();
            self.counters.clear();
        }
        entries.insert(text.to_string(), embedding.clone());

        Ok(embedding)
    }

    fn lookup(&self, text: &str) -> Option<Embedding> {
        let hit = self.entries.lock().get(text).cloned()?;
        self.counters.hit();
        debug!(text_len = text.len(), "Embedding cache hit");
        Some(hit)
    }

    /// Like [`try_get_embedding`](Self::try_get_embedding), but any failure
    /// yields an empty embedding.
    pub fn get_embedding(&self, text: &str) -> Embedding {
        match self.try_get_embedding(text) {
            Ok(embedding) => embedding,
            Err(e) => {
                if e.is_permanent() {
                    debug!(error = %e, "Embedding oracle unavailable");
                } else {
                    warn!(kind = %e.kind(), error = %e, text_len = text.len(), "Failed to embed text");
                }
                Embedding::empty()
            }
        }
    }

    /// Creates a scorer that shares this cache.
    pub fn scorer(self: &Arc<Self>) -> SimilarityScorer {
        SimilarityScorer::new(Arc::clone(self))
    }

    /// Returns the number of cached embeddings.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns `true` if `text` is cached.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.lock().contains_key(text)
    }

    /// Drops every cached embedding.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the entry limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns a snapshot of hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Returns the shared oracle handle.
    pub fn oracle(&self) -> &Arc<OracleHandle> {
        &self.oracle
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("entries", &self.len())
            .field("limit", &self.limit)
            .field("oracle", &self.oracle)
            .finish()
    }
}
