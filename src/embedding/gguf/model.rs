//! Decoder-family GGUF encoder returning per-token hidden states.
//!
//! The weights ([`GgufEncoder`]) and the per-window state derived from them
//! ([`InferenceContext`]: rotary tables and causal mask) are separate values so
//! the context can be freed before the model it was built from.

use std::collections::HashMap;
use std::path::Path;

use candle_core::quantized::{QMatMul, QTensor, gguf_file};
use candle_core::{DType, Device, Module, Result, Tensor};
use candle_nn::Embedding;
use candle_transformers::quantized_nn::RmsNorm;
use candle_transformers::utils::repeat_kv;

use crate::embedding::error::EmbeddingError;

/// Architectures whose GGUF layout this encoder understands.
pub const SUPPORTED_ARCHITECTURES: &[&str] = &["llama", "mistral", "qwen2", "qwen3"];

/// Rotary embedding layout used by an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopeStyle {
    /// Adjacent pairs are rotated (llama.cpp `NORM`).
    Interleaved,
    /// First and second halves are rotated (llama.cpp `NEOX`).
    Neox,
}

impl RopeStyle {
    fn for_architecture(arch: &str) -> Self {
        match arch {
            "qwen2" | "qwen3" => Self::Neox,
            _ => Self::Interleaved,
        }
    }

    fn apply(&self, x: &Tensor, cos: &Tensor, sin: &Tensor) -> Result<Tensor> {
        match self {
            Self::Interleaved => candle_nn::rotary_emb::rope_i(x, cos, sin),
            Self::Neox => candle_nn::rotary_emb::rope(x, cos, sin),
        }
    }
}

/// Shape parameters read from GGUF metadata.
#[derive(Debug, Clone)]
pub struct ArchParams {
    pub architecture: String,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub num_heads: usize,
    pub num_kv_heads: usize,
    pub head_dim: usize,
    pub rms_norm_eps: f64,
    pub rope_theta: f32,
    pub trained_ctx_len: usize,
    pub rope_style: RopeStyle,
}

impl ArchParams {
    /// Reads `general.architecture` and the `{arch}.*` shape keys.
    pub fn from_metadata(
        metadata: &HashMap<String, gguf_file::Value>,
    ) -> std::result::Result<Self, EmbeddingError> {
        let architecture = metadata
            .get("general.architecture")
            .and_then(|v| v.to_string().ok())
            .cloned()
            .ok_or_else(|| load_failed("missing general.architecture"))?;

        if !SUPPORTED_ARCHITECTURES.contains(&architecture.as_str()) {
            return Err(load_failed(format!(
                "unsupported architecture '{}' (supported: {})",
                architecture,
                SUPPORTED_ARCHITECTURES.join(", ")
            )));
        }

        let key = |suffix: &str| format!("{architecture}.{suffix}");
        let required = |suffix: &str| {
            metadata_usize(metadata, &key(suffix))
                .ok_or_else(|| load_failed(format!("missing {}", key(suffix))))
        };

        let hidden_size = required("embedding_length")?;
        let num_layers = required("block_count")?;
        let num_heads = required("attention.head_count")?;
        if num_heads == 0 || hidden_size == 0 {
            return Err(load_failed("zero hidden size or head count"));
        }

        let num_kv_heads =
            metadata_usize(metadata, &key("attention.head_count_kv")).unwrap_or(num_heads);
        if num_kv_heads == 0 || num_heads % num_kv_heads != 0 {
            return Err(load_failed(format!(
                "head count {} is not a multiple of kv head count {}",
                num_heads, num_kv_heads
            )));
        }

        let head_dim = metadata_usize(metadata, &key("attention.key_length"))
            .unwrap_or(hidden_size / num_heads);
        let rms_norm_eps =
            metadata_f64(metadata, &key("attention.layer_norm_rms_epsilon")).unwrap_or(1e-6);
        let default_theta = if architecture.starts_with("qwen") {
            1_000_000.0
        } else {
            10_000.0
        };
        let rope_theta =
            metadata_f64(metadata, &key("rope.freq_base")).unwrap_or(default_theta) as f32;
        let trained_ctx_len = metadata_usize(metadata, &key("context_length")).unwrap_or(2048);
        let rope_style = RopeStyle::for_architecture(&architecture);

        Ok(Self {
            architecture,
            hidden_size,
            num_layers,
            num_heads,
            num_kv_heads,
            head_dim,
            rms_norm_eps,
            rope_theta,
            trained_ctx_len,
            rope_style,
        })
    }
}

fn load_failed(reason: impl Into<String>) -> EmbeddingError {
    EmbeddingError::ModelLoadFailed {
        reason: reason.into(),
    }
}

fn metadata_usize(metadata: &HashMap<String, gguf_file::Value>, key: &str) -> Option<usize> {
    metadata
        .get(key)
        .and_then(|v| v.to_u64().ok())
        .map(|v| v as usize)
}

fn metadata_f64(metadata: &HashMap<String, gguf_file::Value>, key: &str) -> Option<f64> {
    match metadata.get(key)? {
        gguf_file::Value::F32(v) => Some(f64::from(*v)),
        gguf_file::Value::F64(v) => Some(*v),
        _ => None,
    }
}

struct TensorSource<'a> {
    content: &'a gguf_file::Content,
    file: &'a mut std::fs::File,
    device: &'a Device,
}

impl TensorSource<'_> {
    fn qtensor(&mut self, name: &str) -> Result<QTensor> {
        self.content.tensor(&mut *self.file, name, self.device)
    }

    fn has(&self, name: &str) -> bool {
        self.content.tensor_infos.contains_key(name)
    }

    fn matmul(&mut self, name: &str) -> Result<QMatMul> {
        QMatMul::from_qtensor(self.qtensor(name)?)
    }

    fn norm(&mut self, name: &str, eps: f64) -> Result<RmsNorm> {
        RmsNorm::from_qtensor(self.qtensor(name)?, eps)
    }

    fn optional_norm(&mut self, name: &str, eps: f64) -> Result<Option<RmsNorm>> {
        if self.has(name) {
            self.norm(name, eps).map(Some)
        } else {
            Ok(None)
        }
    }

    fn optional_dense(&mut self, name: &str) -> Result<Option<Tensor>> {
        if self.has(name) {
            let device = self.device.clone();
            Ok(Some(self.qtensor(name)?.dequantize(&device)?))
        } else {
            Ok(None)
        }
    }
}

struct Projection {
    weight: QMatMul,
    bias: Option<Tensor>,
}

impl Projection {
    fn load(src: &mut TensorSource<'_>, prefix: &str) -> Result<Self> {
        Ok(Self {
            weight: src.matmul(&format!("{prefix}.weight"))?,
            bias: src.optional_dense(&format!("{prefix}.bias"))?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let y = self.weight.forward(x)?;
        match &self.bias {
            Some(bias) => y.broadcast_add(bias),
            None => Ok(y),
        }
    }
}

struct Block {
    attn_norm: RmsNorm,
    q: Projection,
    k: Projection,
    v: Projection,
    o: QMatMul,
    q_norm: Option<RmsNorm>,
    k_norm: Option<RmsNorm>,
    ffn_norm: RmsNorm,
    gate: QMatMul,
    up: QMatMul,
    down: QMatMul,
}

impl Block {
    fn load(src: &mut TensorSource<'_>, params: &ArchParams, idx: usize) -> Result<Self> {
        let p = format!("blk.{idx}");
        let eps = params.rms_norm_eps;
        Ok(Self {
            attn_norm: src.norm(&format!("{p}.attn_norm.weight"), eps)?,
            q: Projection::load(src, &format!("{p}.attn_q"))?,
            k: Projection::load(src, &format!("{p}.attn_k"))?,
            v: Projection::load(src, &format!("{p}.attn_v"))?,
            o: src.matmul(&format!("{p}.attn_output.weight"))?,
            q_norm: src.optional_norm(&format!("{p}.attn_q_norm.weight"), eps)?,
            k_norm: src.optional_norm(&format!("{p}.attn_k_norm.weight"), eps)?,
            ffn_norm: src.norm(&format!("{p}.ffn_norm.weight"), eps)?,
            gate: src.matmul(&format!("{p}.ffn_gate.weight"))?,
            up: src.matmul(&format!("{p}.ffn_up.weight"))?,
            down: src.matmul(&format!("{p}.ffn_down.weight"))?,
        })
    }

    fn forward(&self, x: &Tensor, params: &ArchParams, ctx: &InferenceContext) -> Result<Tensor> {
        let h = (x + self.attend(&self.attn_norm.forward(x)?, params, ctx)?)?;

        // SwiGLU
        let n = self.ffn_norm.forward(&h)?;
        let act = (candle_nn::ops::silu(&self.gate.forward(&n)?)? * self.up.forward(&n)?)?;
        h + self.down.forward(&act)?
    }

    fn attend(&self, x: &Tensor, params: &ArchParams, ctx: &InferenceContext) -> Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        let (heads, kv_heads, head_dim) = (params.num_heads, params.num_kv_heads, params.head_dim);

        let q = self.q.forward(x)?.reshape((batch, seq_len, heads, head_dim))?;
        let k = self.k.forward(x)?.reshape((batch, seq_len, kv_heads, head_dim))?;
        let v = self.v.forward(x)?.reshape((batch, seq_len, kv_heads, head_dim))?;

        let q = match &self.q_norm {
            Some(norm) => norm.forward(&q.contiguous()?)?,
            None => q,
        };
        let k = match &self.k_norm {
            Some(norm) => norm.forward(&k.contiguous()?)?,
            None => k,
        };

        // [batch, heads, seq, head_dim]
        let q = q.transpose(1, 2)?.contiguous()?;
        let k = k.transpose(1, 2)?.contiguous()?;
        let v = v.transpose(1, 2)?.contiguous()?;

        let (cos, sin) = ctx.rope_tables(seq_len)?;
        let q = params.rope_style.apply(&q, &cos, &sin)?;
        let k = params.rope_style.apply(&k, &cos, &sin)?;

        let n_rep = heads / kv_heads;
        let k = repeat_kv(k, n_rep)?.contiguous()?;
        let v = repeat_kv(v, n_rep)?.contiguous()?;

        let scale = 1.0 / (head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?.broadcast_add(&ctx.causal_mask(seq_len)?)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;

        let out = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, heads * head_dim))?;
        self.o.forward(&out)
    }
}

/// Loaded GGUF weights.
pub struct GgufEncoder {
    tok_embeddings: Embedding,
    blocks: Vec<Block>,
    output_norm: RmsNorm,
    params: ArchParams,
}

impl GgufEncoder {
    /// Reads metadata and weights from a GGUF file.
    pub fn load(path: &Path, device: &Device) -> std::result::Result<Self, EmbeddingError> {
        let mut file = std::fs::File::open(path)?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| load_failed(format!("failed to read GGUF content: {}", e)))?;
        let params = ArchParams::from_metadata(&content.metadata)?;

        let mut src = TensorSource {
            content: &content,
            file: &mut file,
            device,
        };
        Self::load_weights(&mut src, params)
            .map_err(|e| load_failed(format!("failed to load weights: {}", e)))
    }

    fn load_weights(src: &mut TensorSource<'_>, params: ArchParams) -> Result<Self> {
        let device = src.device.clone();
        let embeddings = src.qtensor("token_embd.weight")?.dequantize(&device)?;
        let tok_embeddings = Embedding::new(embeddings, params.hidden_size);

        let blocks = (0..params.num_layers)
            .map(|idx| Block::load(src, &params, idx))
            .collect::<Result<Vec<_>>>()?;

        let output_norm = src.norm("output_norm.weight", params.rms_norm_eps)?;

        Ok(Self {
            tok_embeddings,
            blocks,
            output_norm,
            params,
        })
    }

    pub fn params(&self) -> &ArchParams {
        &self.params
    }

    /// Encodes `input_ids` of shape `[1, seq_len]` into `[1, seq_len, hidden_size]`.
    pub fn forward(&self, ctx: &InferenceContext, input_ids: &Tensor) -> Result<Tensor> {
        let mut hidden = self.tok_embeddings.forward(input_ids)?;
        for block in &self.blocks {
            hidden = block.forward(&hidden, &self.params, ctx)?;
        }
        self.output_norm.forward(&hidden)
    }
}

/// Per-window state sized for at most `capacity` tokens.
pub struct InferenceContext {
    cos: Tensor,
    sin: Tensor,
    mask: Tensor,
    capacity: usize,
}

impl InferenceContext {
    /// Precomputes rotary tables and the causal mask for `capacity` positions.
    pub fn allocate(params: &ArchParams, capacity: usize, device: &Device) -> Result<Self> {
        let half = params.head_dim / 2;
        let inv_freq: Vec<f32> = (0..half)
            .map(|i| 1.0 / params.rope_theta.powf((2 * i) as f32 / params.head_dim as f32))
            .collect();
        let inv_freq = Tensor::from_vec(inv_freq, (1, half), device)?;
        let positions = Tensor::arange(0u32, capacity as u32, device)?
            .to_dtype(DType::F32)?
            .reshape((capacity, 1))?;
        let freqs = positions.matmul(&inv_freq)?;

        let mask: Vec<f32> = (0..capacity)
            .flat_map(|i| (0..capacity).map(move |j| if j <= i { 0.0 } else { f32::NEG_INFINITY }))
            .collect();
        let mask = Tensor::from_vec(mask, (capacity, capacity), device)?;

        Ok(Self {
            cos: freqs.cos()?,
            sin: freqs.sin()?,
            mask,
            capacity,
        })
    }

    /// Maximum tokens per input.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn rope_tables(&self, seq_len: usize) -> Result<(Tensor, Tensor)> {
        Ok((
            self.cos.narrow(0, 0, seq_len)?,
            self.sin.narrow(0, 0, seq_len)?,
        ))
    }

    /// Returns the `[seq_len, seq_len]` causal mask.
    pub fn causal_mask(&self, seq_len: usize) -> Result<Tensor> {
        self.mask.narrow(0, 0, seq_len)?.narrow(1, 0, seq_len)
    }
}
