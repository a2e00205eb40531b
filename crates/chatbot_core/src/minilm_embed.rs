use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Embedding, LayerNorm, Linear, VarBuilder};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

use crate::embed::EmbeddingProvider;

// ---------------------------------------------------------------------------
// all-MiniLM-L6-v2 (BERT, 6 layers, 384 hidden)
// ---------------------------------------------------------------------------

const HIDDEN: usize = 384;
const INTERMEDIATE: usize = 1536;
const HEADS: usize = 12;
const LAYERS: usize = 6;
const VOCAB: usize = 30522;
const MAX_POSITIONS: usize = 512;
const TYPE_VOCAB: usize = 2;
const LAYER_NORM_EPS: f64 = 1e-12;

fn split_heads(x: &Tensor, seq_len: usize) -> Result<Tensor> {
    Ok(x.reshape((1, seq_len, HEADS, HIDDEN / HEADS))?
        .transpose(1, 2)?
        .contiguous()?)
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    dense: Linear,
    norm: LayerNorm,
}

impl SelfAttention {
    fn load(vb: VarBuilder) -> Result<Self> {
        let inner = vb.pp("self");
        let out = vb.pp("output");
        Ok(Self {
            query: candle_nn::linear(HIDDEN, HIDDEN, inner.pp("query"))?,
            key: candle_nn::linear(HIDDEN, HIDDEN, inner.pp("key"))?,
            value: candle_nn::linear(HIDDEN, HIDDEN, inner.pp("value"))?,
            dense: candle_nn::linear(HIDDEN, HIDDEN, out.pp("dense"))?,
            norm: candle_nn::layer_norm(HIDDEN, LAYER_NORM_EPS, out.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_, seq_len, _) = x.dims3()?;
        let q = split_heads(&self.query.forward(x)?, seq_len)?;
        let k = split_heads(&self.key.forward(x)?, seq_len)?;
        let v = split_heads(&self.value.forward(x)?, seq_len)?;

        let scale = 1.0 / ((HIDDEN / HEADS) as f64).sqrt();
        let weights = q.matmul(&k.t()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax_last_dim(&weights)?;
        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((1, seq_len, HIDDEN))?;

        let projected = self.dense.forward(&context)?;
        Ok(self.norm.forward(&(x + projected)?)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    up: Linear,
    down: Linear,
    norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"))?,
            up: candle_nn::linear(HIDDEN, INTERMEDIATE, vb.pp("intermediate").pp("dense"))?,
            down: candle_nn::linear(INTERMEDIATE, HIDDEN, vb.pp("output").pp("dense"))?,
            norm: candle_nn::layer_norm(HIDDEN, LAYER_NORM_EPS, vb.pp("output").pp("LayerNorm"))?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.attention.forward(x)?;
        let h = self.up.forward(&x)?.gelu_erf()?;
        let h = self.down.forward(&h)?;
        Ok(self.norm.forward(&(x + h)?)?)
    }
}

struct MiniLmEncoder {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    device: Device,
}

impl MiniLmEncoder {
    fn load(path: &Path, device: Device) -> Result<Self> {
        // SAFETY: the weights file is memory-mapped read-only and kept alive by the VarBuilder.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)? };

        let emb = vb.pp("embeddings");
        let layers = (0..LAYERS)
            .map(|i| EncoderLayer::load(vb.pp("encoder").pp("layer").pp(i.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            word: candle_nn::embedding(VOCAB, HIDDEN, emb.pp("word_embeddings"))?,
            position: candle_nn::embedding(MAX_POSITIONS, HIDDEN, emb.pp("position_embeddings"))?,
            token_type: candle_nn::embedding(
                TYPE_VOCAB,
                HIDDEN,
                emb.pp("token_type_embeddings"),
            )?,
            norm: candle_nn::layer_norm(HIDDEN, LAYER_NORM_EPS, emb.pp("LayerNorm"))?,
            layers,
            device,
        })
    }

    /// Mean-pooled, L2-normalised sentence embedding.
    fn encode(&self, token_ids: &[u32]) -> Result<Vec<f32>> {
        let seq_len = token_ids.len();
        let ids = Tensor::new(token_ids, &self.device)?;
        let positions = Tensor::arange(0u32, seq_len as u32, &self.device)?;
        let types = Tensor::zeros(seq_len, DType::U32, &self.device)?;

        let embedded = ((self.word.forward(&ids)? + self.position.forward(&positions)?)?
            + self.token_type.forward(&types)?)?;
        let mut hidden = self.norm.forward(&embedded)?.unsqueeze(0)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm = pooled.sqr()?.sum_keepdim(D::Minus1)?.sqrt()?;
        let norm_val: f32 = norm.squeeze(0)?.to_scalar()?;
        let pooled = if norm_val > 0.0 {
            pooled.broadcast_div(&norm)?
        } else {
            pooled
        };
        Ok(pooled.to_vec1::<f32>()?)
    }
}

/// Sentence embeddings from all-MiniLM-L6-v2 weights in safetensors format.
pub struct MiniLmEmbeddingProvider {
    encoder: MiniLmEncoder,
    tokenizer: Tokenizer,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let encoder = MiniLmEncoder::load(model_path, Device::Cpu)
            .with_context(|| format!("load MiniLM weights from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("load tokenizer {}: {e}", tokenizer_path.display()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_POSITIONS,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("configure tokenizer truncation: {e}"))?;

        Ok(Self { encoder, tokenizer })
    }

    pub const DIM: usize = HIDDEN;
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenize: {e}"))?;
        self.encoder.encode(encoding.get_ids())
    }

    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }
}
