//! Embedding oracle seam and its once-only lifecycle.
//!
//! [`EmbeddingOracle`] is the external capability (`initialize` / `embed` /
//! `release`). [`OracleHandle`] owns one oracle and drives the
//! [`OracleState`] machine so that initialization is attempted at most once.

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::error::EmbeddingError;

/// Text → vector capability consumed by the cache.
///
/// Implementations are driven by [`OracleHandle`], which serializes every call.
pub trait EmbeddingOracle: Send {
    /// Starts the backend, loads the model and allocates the inference context.
    ///
    /// Returns the embedding dimension.
    fn initialize(&mut self) -> Result<usize, EmbeddingError>;

    /// Computes the pooled embedding of `text`.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Frees the inference context, then the model.
    fn release(&mut self);
}

/// Lifecycle of an [`OracleHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleState {
    Uninitialized,
    Initializing,
    Ready { dim: usize },
    /// Terminal; initialization is never retried.
    Failed { reason: String },
    /// Resources were released; requests fail without reaching the oracle.
    Released,
}

impl OracleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns a short static label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Initializing => "INITIALIZING",
            Self::Ready { .. } => "READY",
            Self::Failed { .. } => "FAILED",
            Self::Released => "RELEASED",
        }
    }
}

impl std::fmt::Display for OracleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { dim } => write!(f, "READY (dim: {})", dim),
            Self::Failed { reason } => write!(f, "FAILED ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

struct OracleCell {
    state: OracleState,
    oracle: Box<dyn EmbeddingOracle>,
}

impl OracleCell {
    fn ensure_ready(&mut self) -> Result<usize, EmbeddingError> {
        match &self.state {
            OracleState::Ready { dim } => return Ok(*dim),
            OracleState::Failed { reason } => {
                return Err(EmbeddingError::OracleUnavailable {
                    reason: reason.clone(),
                });
            }
            OracleState::Released => {
                return Err(EmbeddingError::OracleUnavailable {
                    reason: "oracle resources were released".to_string(),
                });
            }
            OracleState::Initializing => {
                return Err(EmbeddingError::OracleUnavailable {
                    reason: "initialization already in progress".to_string(),
                });
            }
            OracleState::Uninitialized => {}
        }

        self.state = OracleState::Initializing;
        info!("Initializing embedding oracle");

        match self.oracle.initialize() {
            Ok(0) => {
                let reason = "oracle reported a zero embedding dimension".to_string();
                error!(reason = %reason, "Embedding oracle initialization failed");
                self.oracle.release();
                self.state = OracleState::Failed {
                    reason: reason.clone(),
                };
                Err(EmbeddingError::InvalidConfig { reason })
            }
            Ok(dim) => {
                info!(dim, "Embedding oracle ready");
                self.state = OracleState::Ready { dim };
                Ok(dim)
            }
            Err(e) => {
                error!(error = %e, "Embedding oracle initialization failed");
                self.state = OracleState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

/// Owned oracle resource with lazy, once-only initialization.
///
/// Share it with `Arc`. Every state transition and oracle call happens under one
/// lock, so concurrent first use still yields a single `initialize` attempt.
pub struct OracleHandle {
    cell: Mutex<OracleCell>,
}

impl OracleHandle {
    /// Wraps an oracle without initializing it.
    pub fn new<O: EmbeddingOracle + 'static>(oracle: O) -> Self {
        Self {
            cell: Mutex::new(OracleCell {
                state: OracleState::Uninitialized,
                oracle: Box::new(oracle),
            }),
        }
    }

    /// Initializes the oracle if it has not been tried yet; returns the dimension.
    ///
    /// After a failure this keeps returning
    /// [`EmbeddingError::OracleUnavailable`] without calling the oracle again.
    pub fn initialize(&self) -> Result<usize, EmbeddingError> {
        self.cell.lock().ensure_ready()
    }

    /// Embeds `text`, initializing the oracle first if needed.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut cell = self.cell.lock();
        let dim = cell.ensure_ready()?;

        let vector = cell.oracle.embed(text)?;
        if vector.len() != dim {
            return Err(EmbeddingError::ExtractionFailed {
                reason: format!("expected {} components, got {}", dim, vector.len()),
            });
        }

        Ok(vector)
    }

    /// Releases the oracle's resources once; later requests fail.
    pub fn release(&self) {
        let mut cell = self.cell.lock();
        match cell.state {
            OracleState::Ready { .. } => {
                debug!("Releasing embedding oracle");
                cell.oracle.release();
                cell.state = OracleState::Released;
            }
            OracleState::Uninitialized => {
                cell.state = OracleState::Released;
            }
            OracleState::Initializing => {
                warn!("Release requested while oracle is initializing; ignoring");
            }
            OracleState::Failed { .. } | OracleState::Released => {}
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> OracleState {
        self.cell.lock().state.clone()
    }

    /// Returns the dimension once the oracle is ready.
    pub fn dim(&self) -> Option<usize> {
        match self.cell.lock().state {
            OracleState::Ready { dim } => Some(dim),
            _ => None,
        }
    }
}

impl Drop for OracleHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for OracleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleHandle")
            .field("state", &self.state())
            .finish()
    }
}
