use crate::core::{ClassificationError, ModelOptions};
use tokenizers::Tokenizer;

/// A loaded sequence-classification model usable as a sentiment backend.
///
/// Inference takes `&self`: weights are read-only after construction.
pub trait SentimentAnalysisModel: Send + Sync {
    type Options: std::fmt::Debug + Clone + ModelOptions;

    async fn new(options: Self::Options, device: candle_core::Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer>;

    /// Class probabilities for one encoded text, indexed like [`Self::labels`].
    fn predict_probabilities(
        &self,
        token_ids: &[u32],
        attention_mask: &[u32],
    ) -> Result<Vec<f32>, ClassificationError>;

    fn labels(&self) -> &[String];

    fn device(&self) -> &candle_core::Device;
}
