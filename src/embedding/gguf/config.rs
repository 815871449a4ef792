use std::path::PathBuf;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONTEXT_LEN, DEFAULT_MODEL_PATH, sibling_tokenizer_path,
};
use crate::embedding::error::EmbeddingError;
use crate::embedding::pooling::PoolingMode;

#[derive(Debug, Clone)]
/// Configuration for [`GgufOracle`](super::GgufOracle).
pub struct GgufConfig {
    /// Path to the GGUF model file.
    pub model_path: PathBuf,
    /// Path to `tokenizer.json`.
    pub tokenizer_path: PathBuf,
    /// Max tokens per input; longer inputs fail tokenization.
    pub context_len: usize,
    /// Tokens per forward batch. Each input is encoded as one batch, so this
    /// must cover `context_len`.
    pub batch_size: usize,
    /// Reduction of token states into the output vector.
    pub pooling: PoolingMode,
}

impl Default for GgufConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl GgufConfig {
    /// Creates a config for a model file, inferring `tokenizer.json` from its directory.
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        let model_path = model_path.into();
        Self {
            tokenizer_path: sibling_tokenizer_path(&model_path),
            model_path,
            context_len: DEFAULT_CONTEXT_LEN,
            batch_size: DEFAULT_BATCH_SIZE,
            pooling: PoolingMode::default(),
        }
    }

    pub fn with_tokenizer<P: Into<PathBuf>>(mut self, tokenizer_path: P) -> Self {
        self.tokenizer_path = tokenizer_path.into();
        self
    }

    pub fn with_context_len(mut self, context_len: usize) -> Self {
        self.context_len = context_len;
        self
    }

    pub fn with_pooling(mut self, pooling: PoolingMode) -> Self {
        self.pooling = pooling;
        self
    }

    /// Validates sizes and that the model file exists.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.context_len == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "context_len must be greater than zero".to_string(),
            });
        }

        if self.batch_size < self.context_len {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "batch_size ({}) must be at least context_len ({})",
                    self.batch_size, self.context_len
                ),
            });
        }

        if !self.model_available() {
            return Err(EmbeddingError::ModelNotFound {
                path: self.model_path.clone(),
            });
        }

        Ok(())
    }

    /// Returns `true` if the model file path exists.
    pub fn model_available(&self) -> bool {
        !self.model_path.as_os_str().is_empty() && self.model_path.is_file()
    }

    /// Returns `true` if the tokenizer path exists.
    pub fn tokenizer_available(&self) -> bool {
        !self.tokenizer_path.as_os_str().is_empty() && self.tokenizer_path.exists()
    }
}
