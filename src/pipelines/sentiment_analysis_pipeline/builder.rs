use super::model::SentimentAnalysisModel;
use super::pipeline::SentimentAnalysisPipeline;
use crate::core::global_cache;
use crate::models::{ModernBertSize, SentimentModernBertModel, SentimentModernBertOptions};
use crate::pipelines::utils::{build_cache_key, DeviceRequest};
use tokenizers::{Tokenizer, TruncationParams};

pub const DEFAULT_MAX_LENGTH: usize = 512;

pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
    max_length: usize,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    pub fn cuda_device(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device_request = DeviceRequest::Explicit(device);
        self
    }

    pub fn device_request(mut self, request: DeviceRequest) -> Self {
        self.device_request = request;
        self
    }

    /// Token budget per text. Longer texts are truncated from the end.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    /// Load (or reuse) the model and tokenizer.
    ///
    /// The model is memoised process-wide per options and device, so building
    /// several pipelines for the same checkpoint loads its weights once.
    pub async fn build(self) -> anyhow::Result<SentimentAnalysisPipeline<M>>
    where
        M: Clone + 'static,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        let options = self.options.clone();
        let model = global_cache()
            .get_or_load(&key, || M::new(options, device.clone()))
            .await?;

        let mut tokenizer = M::get_tokenizer(self.options).await?;
        configure_tokenizer(&mut tokenizer, self.max_length)?;

        Ok(SentimentAnalysisPipeline { model, tokenizer })
    }
}

/// Fixed truncation and no padding, so a text always encodes identically.
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> anyhow::Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {e}"))?;
    tokenizer.with_padding(None);
    Ok(())
}

impl SentimentAnalysisPipelineBuilder<SentimentModernBertModel> {
    pub fn modernbert(size: ModernBertSize) -> Self {
        Self::new(SentimentModernBertOptions::Size(size))
    }

    /// Any hub repository holding a ModernBERT sequence-classification checkpoint.
    pub fn modernbert_repo(repo: &str) -> Self {
        Self::new(SentimentModernBertOptions::Repo(repo.to_string()))
    }
}
