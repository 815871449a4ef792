//! Environment-backed configuration.
//!
//! Every knob has a default. Override with `TOPICAL_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;

use crate::constants::{
    CACHE_LIMIT, COMPUTE_THREADS_VAR, DEFAULT_BATCH_SIZE, DEFAULT_CONTEXT_LEN, DEFAULT_MODEL_PATH,
    default_threads, sibling_tokenizer_path,
};
use crate::embedding::{GgufConfig, PoolingMode};

/// Host-supplied configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `TOPICAL_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// GGUF model file. Default: `/tmp/model.gguf`.
    pub model_path: PathBuf,

    /// `tokenizer.json` path. Default: next to the model file.
    pub tokenizer_path: PathBuf,

    /// Max tokens per input. Default: `512`.
    pub context_len: usize,

    /// Tokens per forward batch. Default: `1024`.
    pub batch_size: usize,

    /// How token states are pooled into one vector. Default: mean.
    pub pooling: PoolingMode,

    /// Compute threads. Default: hardware concurrency.
    ///
    /// Not part of [`GgufConfig`]: candle sizes its CPU pool from the
    /// environment, once per process. The `topical` binary applies it at
    /// startup; library hosts apply [`Config::compute_threads_var`] themselves
    /// before the first embedding.
    pub threads: usize,

    /// Cached embeddings before the cache is cleared. Default: `10_000`.
    pub cache_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let model_path = PathBuf::from(DEFAULT_MODEL_PATH);
        Self {
            tokenizer_path: sibling_tokenizer_path(&model_path),
            model_path,
            context_len: DEFAULT_CONTEXT_LEN,
            batch_size: DEFAULT_BATCH_SIZE,
            pooling: PoolingMode::default(),
            threads: default_threads(),
            cache_limit: CACHE_LIMIT,
        }
    }
}

impl Config {
    pub(crate) const ENV_MODEL_PATH: &'static str = "TOPICAL_MODEL_PATH";
    pub(crate) const ENV_TOKENIZER_PATH: &'static str = "TOPICAL_TOKENIZER_PATH";
    pub(crate) const ENV_CONTEXT_LEN: &'static str = "TOPICAL_CONTEXT_LEN";
    pub(crate) const ENV_BATCH_SIZE: &'static str = "TOPICAL_BATCH_SIZE";
    pub(crate) const ENV_POOLING: &'static str = "TOPICAL_POOLING";
    pub(crate) const ENV_THREADS: &'static str = "TOPICAL_THREADS";
    pub(crate) const ENV_CACHE_LIMIT: &'static str = "TOPICAL_CACHE_LIMIT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let model_path = Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH)
            .unwrap_or(defaults.model_path);
        let tokenizer_path = Self::parse_optional_path_from_env(Self::ENV_TOKENIZER_PATH)
            .unwrap_or_else(|| sibling_tokenizer_path(&model_path));
        let context_len = Self::parse_usize_from_env(Self::ENV_CONTEXT_LEN, defaults.context_len)?;
        let batch_size = Self::parse_usize_from_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?;
        let pooling = Self::parse_pooling_from_env(defaults.pooling)?;
        let threads = Self::parse_usize_from_env(Self::ENV_THREADS, defaults.threads)?;
        let cache_limit = Self::parse_usize_from_env(Self::ENV_CACHE_LIMIT, defaults.cache_limit)?;

        Ok(Self {
            model_path,
            tokenizer_path,
            context_len,
            batch_size,
            pooling,
            threads,
            cache_limit,
        })
    }

    /// Validates sizes and the model path (does not load anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("context_len", self.context_len),
            ("batch_size", self.batch_size),
            ("threads", self.threads),
            ("cache_limit", self.cache_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { name });
            }
        }

        if self.batch_size < self.context_len {
            return Err(ConfigError::BatchTooSmall {
                batch_size: self.batch_size,
                context_len: self.context_len,
            });
        }

        if !self.model_path.exists() {
            return Err(ConfigError::PathNotFound {
                path: self.model_path.clone(),
            });
        }
        if !self.model_path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.model_path.clone(),
            });
        }

        Ok(())
    }

    /// Returns the environment variable and value that size the compute pool.
    pub fn compute_threads_var(&self) -> (&'static str, String) {
        (COMPUTE_THREADS_VAR, self.threads.to_string())
    }

    /// Returns the oracle-level subset of this configuration.
    pub fn gguf_config(&self) -> GgufConfig {
        GgufConfig {
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            context_len: self.context_len,
            batch_size: self.batch_size,
            pooling: self.pooling,
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_usize_from_env(var_name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_pooling_from_env(default: PoolingMode) -> Result<PoolingMode, ConfigError> {
        match env::var(Self::ENV_POOLING) {
            Ok(value) => value.parse(),
            Err(_) => Ok(default),
        }
    }
}
