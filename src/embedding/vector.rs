use std::ops::Deref;
use std::sync::Arc;

/// Immutable embedding vector shared between the cache and scorers.
///
/// An empty embedding means "no embedding available" for the text it was
/// requested for. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Default)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    /// Returns the "no embedding available" value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of components.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Returns `true` if both embeddings share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values.into())
    }
}

impl From<&[f32]> for Embedding {
    fn from(values: &[f32]) -> Self {
        Self(values.into())
    }
}

impl std::fmt::Debug for Embedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedding")
            .field("dim", &self.dim())
            .field("head", &&self.0[..self.dim().min(4)])
            .finish()
    }
}
