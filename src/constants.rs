//! Cross-cutting, shared constants.
//!
//! Oracle sizing knobs default to the values the grammar plugin has always used:
//! a 512-token context window inside a 1024-token batch, mean pooling.

use std::path::PathBuf;

/// Number of cached embeddings at which the whole cache is cleared.
pub const CACHE_LIMIT: usize = 10_000;

/// Maximum tokens per input accepted by the inference context.
pub const DEFAULT_CONTEXT_LEN: usize = 512;

/// Tokens per forward batch; must be at least [`DEFAULT_CONTEXT_LEN`].
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Model file used when no path is configured.
pub const DEFAULT_MODEL_PATH: &str = "/tmp/model.gguf";

/// Tokenizer file name looked up next to the model.
pub const TOKENIZER_FILE_NAME: &str = "tokenizer.json";

/// Score returned whenever no similarity signal is available.
pub const NEUTRAL_SCORE: f64 = 0.0;

/// Environment variable candle's CPU backend reads its thread count from.
pub const COMPUTE_THREADS_VAR: &str = "RAYON_NUM_THREADS";

/// Thread count used when none is configured.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Returns the tokenizer path that sits next to `model_path`.
pub fn sibling_tokenizer_path(model_path: &std::path::Path) -> PathBuf {
    model_path
        .parent()
        .map(|p| p.join(TOKENIZER_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(TOKENIZER_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_batch_fits_context() {
        assert!(DEFAULT_BATCH_SIZE >= DEFAULT_CONTEXT_LEN);
    }

    #[test]
    fn test_default_threads_non_zero() {
        assert!(default_threads() >= 1);
    }

    #[test]
    fn test_sibling_tokenizer_path() {
        assert_eq!(
            sibling_tokenizer_path(Path::new("/models/bge.gguf")),
            PathBuf::from("/models/tokenizer.json")
        );
        assert_eq!(
            sibling_tokenizer_path(Path::new("model.gguf")),
            PathBuf::from("tokenizer.json")
        );
    }
}
