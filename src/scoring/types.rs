/// Which input of a query an embedding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Context,
    Word,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Context => "context",
            Side::Word => "word",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-facing scoring capability.
///
/// `query` never fails: when no similarity signal is available it returns `0.0`.
pub trait Grammar: Send + Sync {
    /// Scores how well `word` fits `context`, in `[0, 1]`.
    ///
    /// `is_rear` marks a word at the end of the sentence; the base scorer ignores it.
    fn query(&self, context: &str, word: &str, is_rear: bool) -> f64;
}
