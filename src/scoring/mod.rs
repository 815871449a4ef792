//! Context/word similarity scoring.
//!
//! [`SimilarityScorer`] resolves both embeddings through the shared
//! [`EmbeddingCache`](crate::cache::EmbeddingCache) and compares them with
//! [`topical_similarity`]. Failures stay typed in [`SimilarityScorer::score`]
//! and collapse to a neutral `0.0` only at [`Grammar::query`].

pub mod error;
pub mod scorer;
pub mod similarity;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ScoringError;
pub use scorer::SimilarityScorer;
pub use similarity::topical_similarity;
pub use types::{Grammar, Side};
