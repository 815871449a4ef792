use std::str::FromStr;

use candle_core::{IndexOp, Tensor};

use crate::config::ConfigError;

/// How per-token hidden states are reduced to one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingMode {
    /// Average over all tokens.
    #[default]
    Mean,
    /// Final token's state.
    Last,
    /// First token's state.
    Cls,
}

impl PoolingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Last => "last",
            Self::Cls => "cls",
        }
    }

    /// Pools `hidden` of shape `[1, seq_len, hidden_size]` into `[hidden_size]`.
    pub fn pool(&self, hidden: &Tensor) -> candle_core::Result<Tensor> {
        let (_batch, seq_len, _hidden) = hidden.dims3()?;
        let states = hidden.i(0)?;
        match self {
            Self::Mean => states.mean(0),
            Self::Last => states.i(seq_len.saturating_sub(1)),
            Self::Cls => states.i(0),
        }
    }
}

impl FromStr for PoolingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "last" => Ok(Self::Last),
            "cls" => Ok(Self::Cls),
            _ => Err(ConfigError::InvalidPooling {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PoolingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
