//! Embedding oracle, its lifecycle, and the bundled GGUF backend.
//!
//! - [`oracle`] defines the [`EmbeddingOracle`] seam and the once-only
//!   [`OracleHandle`] state machine.
//! - [`gguf`] is the candle-backed oracle over a local GGUF model.

/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// GGUF embedding oracle.
pub mod gguf;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Oracle trait and lifecycle.
pub mod oracle;
/// Token-state pooling.
pub mod pooling;
/// Tokenizer loading helpers.
pub mod utils;
mod vector;


pub use error::{EmbeddingError, EmbeddingErrorKind};
pub use gguf::{GgufConfig, GgufOracle};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockOracle, MockOracleProbe};
pub use oracle::{EmbeddingOracle, OracleHandle, OracleState};
pub use pooling::PoolingMode;
pub use vector::Embedding;
