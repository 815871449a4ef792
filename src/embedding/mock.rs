//! Scriptable in-memory oracle for tests.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{EmbeddingError, EmbeddingErrorKind};
use super::oracle::EmbeddingOracle;

#[derive(Default)]
struct ProbeCounters {
    initialize_calls: usize,
    release_calls: usize,
    embed_calls: HashMap<String, usize>,
}

/// Shared view of a [`MockOracle`]'s call counts, usable after the oracle is moved.
#[derive(Clone, Default)]
pub struct MockOracleProbe {
    counters: Arc<Mutex<ProbeCounters>>,
}

impl MockOracleProbe {
    pub fn initialize_calls(&self) -> usize {
        self.counters.lock().initialize_calls
    }

    pub fn release_calls(&self) -> usize {
        self.counters.lock().release_calls
    }

    /// Number of `embed` calls for exactly `text`.
    pub fn embed_calls_for(&self, text: &str) -> usize {
        self.counters
            .lock()
            .embed_calls
            .get(text)
            .copied()
            .unwrap_or(0)
    }

    /// Total `embed` calls across all texts.
    pub fn total_embed_calls(&self) -> usize {
        self.counters.lock().embed_calls.values().sum()
    }
}

/// Oracle returning fixed vectors from a table.
///
/// Texts missing from the table fail extraction unless
/// [`MockOracle::with_seeded_fallback`] is enabled.
pub struct MockOracle {
    dim: usize,
    table: HashMap<String, Vec<f32>>,
    failures: HashMap<String, EmbeddingErrorKind>,
    seeded_fallback: bool,
    fail_initialization: bool,
    loaded: bool,
    probe: MockOracleProbe,
}

impl MockOracle {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            table: HashMap::new(),
            failures: HashMap::new(),
            seeded_fallback: false,
            fail_initialization: false,
            loaded: false,
            probe: MockOracleProbe::default(),
        }
    }

    /// Maps `text` to `vector`.
    pub fn with_embedding(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    /// Makes every `embed(text)` fail with an error of `kind`.
    pub fn with_failure(mut self, text: &str, kind: EmbeddingErrorKind) -> Self {
        self.failures.insert(text.to_string(), kind);
        self
    }

    /// Generates deterministic hash-seeded vectors for unknown texts.
    pub fn with_seeded_fallback(mut self) -> Self {
        self.seeded_fallback = true;
        self
    }

    /// Makes `initialize` fail.
    pub fn failing_initialization(mut self) -> Self {
        self.fail_initialization = true;
        self
    }

    pub fn probe(&self) -> MockOracleProbe {
        self.probe.clone()
    }

    fn seeded_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        (0..self.dim)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn scripted_error(kind: EmbeddingErrorKind, text: &str) -> EmbeddingError {
        let reason = format!("scripted {} failure for '{}'", kind, text);
        match kind {
            EmbeddingErrorKind::Initialization => EmbeddingError::OracleUnavailable { reason },
            EmbeddingErrorKind::Tokenization => EmbeddingError::TokenizationFailed { reason },
            EmbeddingErrorKind::Inference => EmbeddingError::InferenceFailed { reason },
            EmbeddingErrorKind::Extraction => EmbeddingError::ExtractionFailed { reason },
        }
    }
}

impl EmbeddingOracle for MockOracle {
    fn initialize(&mut self) -> Result<usize, EmbeddingError> {
        self.probe.counters.lock().initialize_calls += 1;

        if self.fail_initialization {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: "mock configured to fail initialization".to_string(),
            });
        }

        self.loaded = true;
        Ok(self.dim)
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        *self
            .probe
            .counters
            .lock()
            .embed_calls
            .entry(text.to_string())
            .or_insert(0) += 1;

        if !self.loaded {
            return Err(EmbeddingError::OracleUnavailable {
                reason: "mock not initialized".to_string(),
            });
        }

        if let Some(kind) = self.failures.get(text) {
            return Err(Self::scripted_error(*kind, text));
        }

        match self.table.get(text) {
            Some(vector) => Ok(vector.clone()),
            None if self.seeded_fallback => Ok(self.seeded_vector(text)),
            None => Err(EmbeddingError::ExtractionFailed {
                reason: format!("no mock embedding for '{}'", text),
            }),
        }
    }

    fn release(&mut self) {
        self.probe.counters.lock().release_calls += 1;
        self.loaded = false;
    }
}
