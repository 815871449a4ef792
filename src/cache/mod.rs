//! Embedding cache in front of the oracle.

pub mod embedding_cache;
pub mod stats;


pub use embedding_cache::EmbeddingCache;
pub use stats::CacheStats;
