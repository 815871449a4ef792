//! GGUF-backed embedding oracle (candle + tokenizers).
//!
//! Initialization starts the compute backend, loads the model and its
//! tokenizer, then allocates an inference context sized for
//! [`GgufConfig::context_len`] tokens. Each `embed` call is one forward pass
//! over the whole input followed by pooling.

/// Oracle configuration.
pub mod config;
/// Encoder weights and inference context.
pub mod model;


pub use config::GgufConfig;
pub use model::{ArchParams, GgufEncoder, InferenceContext, RopeStyle, SUPPORTED_ARCHITECTURES};

use candle_core::{DType, Device, Tensor};
use tracing::{debug, info, warn};

use crate::embedding::device::{device_label, select_device};
use crate::embedding::error::EmbeddingError;
use crate::embedding::oracle::EmbeddingOracle;
use crate::embedding::utils::load_tokenizer;

// Field order is drop order: the context goes before the model.
struct Session {
    context: InferenceContext,
    model: GgufEncoder,
    tokenizer: tokenizers::Tokenizer,
    device: Device,
}

/// [`EmbeddingOracle`] over a local GGUF model.
pub struct GgufOracle {
    config: GgufConfig,
    session: Option<Session>,
}

impl std::fmt::Debug for GgufOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GgufOracle")
            .field("model_path", &self.config.model_path)
            .field("context_len", &self.config.context_len)
            .field("pooling", &self.config.pooling)
            .field(
                "session",
                &self
                    .session
                    .as_ref()
                    .map(|s| format!("Loaded({})", device_label(&s.device))),
            )
            .finish()
    }
}

impl GgufOracle {
    /// Creates an oracle; nothing is loaded until [`EmbeddingOracle::initialize`].
    pub fn new(config: GgufConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &GgufConfig {
        &self.config
    }

    /// Returns `true` while model resources are held.
    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    fn open_session(&self) -> Result<Session, EmbeddingError> {
        self.config.validate()?;

        let device = select_device();
        debug!(device = device_label(&device), "Selected compute device");

        let model = GgufEncoder::load(&self.config.model_path, &device)?;

        let tokenizer = load_tokenizer(&self.config.tokenizer_path).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("failed to load tokenizer: {}", e),
            }
        })?;

        let params = model.params();
        if self.config.context_len > params.trained_ctx_len {
            warn!(
                context_len = self.config.context_len,
                trained_ctx_len = params.trained_ctx_len,
                "Context window exceeds the model's training length"
            );
        }

        let context = InferenceContext::allocate(params, self.config.context_len, &device)
            .map_err(|e| EmbeddingError::ContextAllocFailed {
                reason: e.to_string(),
            })?;

        Ok(Session {
            context,
            model,
            tokenizer,
            device,
        })
    }

    fn encode(&self, session: &Session, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding = session.tokenizer.encode(text, true).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let tokens = encoding.get_ids();
        if tokens.is_empty() {
            return Err(EmbeddingError::TokenizationFailed {
                reason: "input produced no tokens".to_string(),
            });
        }
        if tokens.len() > session.context.capacity() {
            return Err(EmbeddingError::TokenizationFailed {
                reason: format!(
                    "{} tokens exceed the {}-token context window",
                    tokens.len(),
                    session.context.capacity()
                ),
            });
        }

        debug!(
            text_len = text.len(),
            token_count = tokens.len(),
            "Encoding text"
        );

        let input_ids = Tensor::new(tokens, &session.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("failed to build input batch: {}", e),
            })?;

        let hidden = session
            .model
            .forward(&session.context, &input_ids)
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("forward pass failed: {}", e),
            })?;

        let pooled = self
            .config
            .pooling
            .pool(&hidden)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| EmbeddingError::ExtractionFailed {
                reason: e.to_string(),
            })?;

        if pooled.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::ExtractionFailed {
                reason: "pooled embedding contains non-finite values".to_string(),
            });
        }

        Ok(pooled)
    }
}

impl EmbeddingOracle for GgufOracle {
    fn initialize(&mut self) -> Result<usize, EmbeddingError> {
        if let Some(session) = &self.session {
            return Ok(session.model.params().hidden_size);
        }

        let session = self.open_session()?;
        let params = session.model.params();
        let dim = params.hidden_size;

        info!(
            model_path = %self.config.model_path.display(),
            architecture = %params.architecture,
            num_layers = params.num_layers,
            dim,
            context_len = self.config.context_len,
            pooling = %self.config.pooling,
            device = device_label(&session.device),
            "GGUF model loaded successfully"
        );

        self.session = Some(session);
        Ok(dim)
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| EmbeddingError::OracleUnavailable {
                reason: "model is not loaded".to_string(),
            })?;
        self.encode(session, text)
    }

    fn release(&mut self) {
        if let Some(Session {
            context,
            model,
            tokenizer,
            device,
        }) = self.session.take()
        {
            drop(context);
            drop(model);
            drop(tokenizer);
            debug!(device = device_label(&device), "GGUF model released");
        }
    }
}
