//! ModernBERT encoder with a sequence-classification head.
//!
//! ModernBERT is an encoder-only Transformer that alternates sliding-window
//! (local) attention layers with global attention layers and uses rotary
//! position embeddings. Only the classification variant is built here; the
//! label set is whatever the checkpoint's `config.json` declares in `id2label`.

use candle_core::{DType, Device, IndexOp, Result, Tensor, D};
use candle_nn::{
    embedding, layer_norm_no_bias, linear, linear_no_bias, ops::softmax, Embedding, LayerNorm,
    Linear, Module, VarBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const MASK_FILL: f64 = f32::MIN as f64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    pub layer_norm_eps: f64,
    pub global_attn_every_n_layers: usize,
    pub global_rope_theta: f64,
    pub local_attention: usize,
    pub local_rope_theta: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierPooling {
    Cls,
    #[default]
    Mean,
}

/// Classification metadata read from the same `config.json` as [`Config`].
#[derive(Debug, Clone, Deserialize)]
struct ClassifierMeta {
    id2label: HashMap<String, String>,
    #[serde(default)]
    classifier_pooling: Option<ClassifierPooling>,
}

impl ClassifierMeta {
    /// Label names indexed by class id. Ids must be the contiguous range `0..n`.
    fn ordered_labels(&self) -> anyhow::Result<Vec<String>> {
        let mut by_id = self
            .id2label
            .iter()
            .map(|(id, label)| {
                id.parse::<usize>()
                    .map(|id| (id, label.clone()))
                    .map_err(|_| anyhow::anyhow!("id2label key '{id}' is not a class index"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        by_id.sort_by_key(|(id, _)| *id);

        if by_id.iter().enumerate().any(|(pos, (id, _))| pos != *id) {
            anyhow::bail!("id2label ids are not contiguous from 0");
        }
        Ok(by_id.into_iter().map(|(_, label)| label).collect())
    }
}

#[derive(Debug, Clone)]
struct RotaryEmbedding {
    sin: Tensor,
    cos: Tensor,
}

impl RotaryEmbedding {
    fn new(dtype: DType, config: &Config, theta: f64, device: &Device) -> Result<Self> {
        let head_dim = config.hidden_size / config.num_attention_heads;
        let inv_freq: Vec<f32> = (0..head_dim)
            .step_by(2)
            .map(|i| (1.0 / theta.powf(i as f64 / head_dim as f64)) as f32)
            .collect();
        let half = inv_freq.len();
        let inv_freq = Tensor::from_vec(inv_freq, (1, half), device)?.to_dtype(dtype)?;

        let max_len = config.max_position_embeddings;
        let positions = Tensor::arange(0u32, max_len as u32, device)?
            .to_dtype(dtype)?
            .reshape((max_len, 1))?;
        let freqs = positions.matmul(&inv_freq)?;

        Ok(Self {
            sin: freqs.sin()?,
            cos: freqs.cos()?,
        })
    }

    fn rotate(&self, q: &Tensor, k: &Tensor) -> Result<(Tensor, Tensor)> {
        let q = candle_nn::rotary_emb::rope(&q.contiguous()?, &self.cos, &self.sin)?;
        let k = candle_nn::rotary_emb::rope(&k.contiguous()?, &self.cos, &self.sin)?;
        Ok((q, k))
    }
}

#[derive(Debug, Clone)]
struct SelfAttention {
    wqkv: Linear,
    wo: Linear,
    num_heads: usize,
    head_dim: usize,
    rotary: Arc<RotaryEmbedding>,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &Config, rotary: Arc<RotaryEmbedding>) -> Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            wqkv: linear_no_bias(hidden, hidden * 3, vb.pp("Wqkv"))?,
            wo: linear_no_bias(hidden, hidden, vb.pp("Wo"))?,
            num_heads: config.num_attention_heads,
            head_dim: hidden / config.num_attention_heads,
            rotary,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden) = xs.dims3()?;

        // (3, batch, heads, seq, head_dim)
        let qkv = xs
            .apply(&self.wqkv)?
            .reshape((batch, seq_len, 3, self.num_heads, self.head_dim))?
            .permute((2, 0, 3, 1, 4))?;
        let (q, k) = self.rotary.rotate(&qkv.get(0)?, &qkv.get(1)?)?;
        let v = qkv.get(2)?;

        let q = (q * (self.head_dim as f64).powf(-0.5))?;
        let scores = q
            .matmul(&k.transpose(D::Minus2, D::Minus1)?)?
            .broadcast_add(mask)?;
        let probs = softmax(&scores, D::Minus1)?;

        probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden))?
            .apply(&self.wo)
    }
}

/// GeGLU feed-forward block.
#[derive(Debug, Clone)]
struct Mlp {
    wi: Linear,
    wo: Linear,
}

impl Mlp {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            wi: linear_no_bias(config.hidden_size, config.intermediate_size * 2, vb.pp("Wi"))?,
            wo: linear_no_bias(config.intermediate_size, config.hidden_size, vb.pp("Wo"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let gate_input = xs.apply(&self.wi)?.chunk(2, D::Minus1)?;
        (&gate_input[0].gelu_erf()? * &gate_input[1])?.apply(&self.wo)
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attn: SelfAttention,
    mlp: Mlp,
    // Layer 0 has no attention norm in the checkpoints.
    attn_norm: Option<LayerNorm>,
    mlp_norm: LayerNorm,
    local: bool,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config, rotary: Arc<RotaryEmbedding>, local: bool) -> Result<Self> {
        Ok(Self {
            attn: SelfAttention::load(vb.pp("attn"), config, rotary)?,
            mlp: Mlp::load(vb.pp("mlp"), config)?,
            attn_norm: layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("attn_norm"))
                .ok(),
            mlp_norm: layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("mlp_norm"))?,
            local,
        })
    }

    fn forward(&self, xs: &Tensor, global_mask: &Tensor, local_mask: &Tensor) -> Result<Tensor> {
        let normed = match &self.attn_norm {
            Some(norm) => xs.apply(norm)?,
            None => xs.clone(),
        };

        let attn_out = if self.local {
            self.attn
                .forward(&normed, &global_mask.broadcast_add(local_mask)?)?
        } else {
            self.attn.forward(&normed, global_mask)?
        };
        let xs = (xs + attn_out)?;

        let mlp_out = xs.apply(&self.mlp_norm)?.apply(&self.mlp)?;
        xs + mlp_out
    }
}

#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    norm: LayerNorm,
    classifier: Linear,
    pooling: ClassifierPooling,
}

impl ClassificationHead {
    fn load(
        vb: VarBuilder,
        config: &Config,
        num_labels: usize,
        pooling: ClassifierPooling,
    ) -> Result<Self> {
        Ok(Self {
            dense: linear_no_bias(config.hidden_size, config.hidden_size, vb.pp("head.dense"))?,
            norm: layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("head.norm"))?,
            classifier: linear(config.hidden_size, num_labels, vb.pp("classifier"))?,
            pooling,
        })
    }

    fn forward(&self, hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let pooled = match self.pooling {
            ClassifierPooling::Cls => hidden.i((.., 0, ..))?,
            ClassifierPooling::Mean => {
                let mask = attention_mask.unsqueeze(D::Minus1)?.to_dtype(DType::F32)?;
                let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
                let counts = attention_mask.sum_keepdim(1)?.to_dtype(DType::F32)?;
                summed.broadcast_div(&counts)?
            }
        };

        pooled
            .apply(&self.dense)?
            .gelu_erf()?
            .apply(&self.norm)?
            .apply(&self.classifier)
    }
}

#[derive(Debug, Clone)]
struct Encoder {
    embeddings: Embedding,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    final_norm: LayerNorm,
    local_window: usize,
    device: Device,
    dtype: DType,
}

impl Encoder {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let global_rotary = Arc::new(RotaryEmbedding::new(
            vb.dtype(),
            config,
            config.global_rope_theta,
            vb.device(),
        )?);
        let local_rotary = Arc::new(RotaryEmbedding::new(
            vb.dtype(),
            config,
            config.local_rope_theta,
            vb.device(),
        )?);

        let layers = (0..config.num_hidden_layers)
            .map(|idx| {
                let local = idx % config.global_attn_every_n_layers != 0;
                let rotary = if local { &local_rotary } else { &global_rotary };
                EncoderLayer::load(
                    vb.pp(format!("model.layers.{idx}")),
                    config,
                    Arc::clone(rotary),
                    local,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("model.embeddings.tok_embeddings"),
            )?,
            embedding_norm: layer_norm_no_bias(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("model.embeddings.norm"),
            )?,
            layers,
            final_norm: layer_norm_no_bias(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("model.final_norm"),
            )?,
            local_window: config.local_attention,
            device: vb.device().clone(),
            dtype: vb.dtype(),
        })
    }

    /// Additive mask hiding padded keys: `(batch, 1, seq, seq)`.
    fn padding_mask(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        let keep = attention_mask
            .unsqueeze(1)?
            .unsqueeze(2)?
            .expand((batch, 1, seq_len, seq_len))?
            .to_dtype(self.dtype)?;
        ((1.0 - keep)? * MASK_FILL)?.to_dtype(self.dtype)
    }

    /// Additive mask restricting attention to the sliding window: `(seq, seq)`.
    fn window_mask(&self, seq_len: usize) -> Result<Tensor> {
        let half_window = self.local_window / 2;
        let mask: Vec<f32> = (0..seq_len)
            .flat_map(|i| {
                (0..seq_len).map(move |j| {
                    if i.abs_diff(j) > half_window {
                        f32::NEG_INFINITY
                    } else {
                        0.0
                    }
                })
            })
            .collect();
        Tensor::from_slice(&mask, (seq_len, seq_len), &self.device)?.to_dtype(self.dtype)
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let global_mask = self.padding_mask(attention_mask)?;
        let local_mask = self.window_mask(input_ids.dim(1)?)?;

        let mut hidden = input_ids
            .apply(&self.embeddings)?
            .apply(&self.embedding_norm)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, &global_mask, &local_mask)?;
        }
        hidden.apply(&self.final_norm)
    }
}

/// ModernBERT model for sequence classification.
#[derive(Debug, Clone)]
pub struct ModernBertForSequenceClassification {
    encoder: Arc<Encoder>,
    head: ClassificationHead,
}

impl ModernBertForSequenceClassification {
    pub fn load(
        vb: VarBuilder,
        config: &Config,
        num_labels: usize,
        pooling: ClassifierPooling,
    ) -> Result<Self> {
        let encoder = Arc::new(Encoder::load(vb.clone(), config)?);
        let head = ClassificationHead::load(vb, config, num_labels, pooling)?;
        Ok(Self { encoder, head })
    }

    /// Classification logits with shape `(batch_size, num_labels)`.
    ///
    /// `attention_mask` is 1 for real tokens and 0 for padding.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden = self.encoder.forward(input_ids, attention_mask)?;
        self.head.forward(&hidden, attention_mask)
    }
}

/*
Pipeline Implementation
*/

use crate::core::{ClassificationError, ModelOptions};
use crate::loaders::{ModelConfigLoader, TokenizerLoader, WeightsLoader};
use crate::pipelines::sentiment_analysis_pipeline::model::SentimentAnalysisModel;
use anyhow::Context;
use tokenizers::Tokenizer;

/// Available ModernBERT sentiment checkpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModernBertSize {
    #[default]
    Base,
    Large,
}

impl ModernBertSize {
    pub fn repo_id(&self) -> &'static str {
        match self {
            ModernBertSize::Base => "clapAI/modernBERT-base-multilingual-sentiment",
            ModernBertSize::Large => "clapAI/modernBERT-large-multilingual-sentiment",
        }
    }
}

impl std::fmt::Display for ModernBertSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModernBertSize::Base => "modernbert-base",
            ModernBertSize::Large => "modernbert-large",
        };
        write!(f, "{name}")
    }
}

/// Which checkpoint to load: a known size or any hub repo with the same
/// architecture and a classification head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SentimentModernBertOptions {
    Size(ModernBertSize),
    Repo(String),
}

impl SentimentModernBertOptions {
    pub fn repo_id(&self) -> &str {
        match self {
            SentimentModernBertOptions::Size(size) => size.repo_id(),
            SentimentModernBertOptions::Repo(repo) => repo,
        }
    }
}

impl From<ModernBertSize> for SentimentModernBertOptions {
    fn from(size: ModernBertSize) -> Self {
        SentimentModernBertOptions::Size(size)
    }
}

impl ModelOptions for SentimentModernBertOptions {
    fn cache_key(&self) -> String {
        match self {
            SentimentModernBertOptions::Size(size) => size.to_string(),
            SentimentModernBertOptions::Repo(repo) => repo.clone(),
        }
    }
}

/// Sentiment analysis model using ModernBERT.
#[derive(Clone)]
pub struct SentimentModernBertModel {
    model: ModernBertForSequenceClassification,
    device: Device,
    labels: Vec<String>,
}

impl SentimentModernBertModel {
    pub async fn new(options: SentimentModernBertOptions, device: Device) -> anyhow::Result<Self> {
        let repo = options.repo_id();
        tracing::info!(repo, ?device, "loading sentiment model");

        let config_content = ModelConfigLoader::new(repo).load().await?;
        let config: Config = serde_json::from_str(&config_content)
            .context("Failed to parse model config")?;
        let meta: ClassifierMeta = serde_json::from_str(&config_content)
            .context("Failed to parse classifier config")?;
        let labels = meta.ordered_labels()?;
        let pooling = meta.classifier_pooling.unwrap_or_default();

        let weights = WeightsLoader::new(repo).load().await?;
        let dtype = DType::F32;
        let vb = match weights.extension().and_then(|ext| ext.to_str()) {
            Some("safetensors") => unsafe {
                VarBuilder::from_mmaped_safetensors(&[&weights], dtype, &device)?
            },
            Some("bin") => VarBuilder::from_pth(&weights, dtype, &device)?,
            _ => anyhow::bail!("Unsupported weight file format: {:?}", weights),
        };

        let model = ModernBertForSequenceClassification::load(vb, &config, labels.len(), pooling)?;
        tracing::info!(repo, labels = ?labels, "sentiment model ready");

        Ok(Self {
            model,
            device,
            labels,
        })
    }

    /// Class probabilities for one encoded text, ordered like [`Self::labels`].
    pub fn predict_probabilities(
        &self,
        token_ids: &[u32],
        attention_mask: &[u32],
    ) -> Result<Vec<f32>> {
        let input_ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(attention_mask, &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl SentimentAnalysisModel for SentimentModernBertModel {
    type Options = SentimentModernBertOptions;

    async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
        SentimentModernBertModel::new(options, device).await
    }

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer> {
        TokenizerLoader::new(options.repo_id(), "tokenizer.json")
            .load()
            .await
    }

    fn predict_probabilities(
        &self,
        token_ids: &[u32],
        attention_mask: &[u32],
    ) -> std::result::Result<Vec<f32>, ClassificationError> {
        Ok(SentimentModernBertModel::predict_probabilities(
            self,
            token_ids,
            attention_mask,
        )?)
    }

    fn labels(&self) -> &[String] {
        SentimentModernBertModel::labels(self)
    }

    fn device(&self) -> &Device {
        SentimentModernBertModel::device(self)
    }
}
