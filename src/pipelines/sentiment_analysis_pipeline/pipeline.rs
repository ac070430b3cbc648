use super::model::SentimentAnalysisModel;
use crate::core::ClassificationError;
use crate::pipelines::classifier::{Classifier, Prediction};
use tokenizers::Tokenizer;

/// Classifies the sentiment of single texts with a loaded model.
///
/// Construct with [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder).
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Predict sentiment as the most probable label and its probability.
    ///
    /// Tokenizer failures and texts that encode to zero tokens are
    /// preprocessing errors; backend faults are inference errors.
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassificationError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassificationError::preprocessing(format!("Tokenization error: {e}")))?;
        if encoding.get_ids().is_empty() {
            return Err(ClassificationError::preprocessing(
                "text produced an empty encoding",
            ));
        }

        let probabilities = self
            .model
            .predict_probabilities(encoding.get_ids(), encoding.get_attention_mask())?;

        let (class_id, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| ClassificationError::inference("model returned no class scores"))?;

        let label = self.model.labels().get(class_id).cloned().ok_or_else(|| {
            ClassificationError::unknown(format!(
                "Predicted ID '{class_id}' not found in id2label map"
            ))
        })?;

        Ok(Prediction { label, confidence })
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

impl<M: SentimentAnalysisModel> Classifier for SentimentAnalysisPipeline<M> {
    fn classify(&self, text: &str) -> Result<Prediction, ClassificationError> {
        self.predict(text)
    }

    fn labels(&self) -> Vec<String> {
        self.model.labels().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, ModelOptions};
    use std::str::FromStr;

    const WORD_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "great": 1, "awful": 2, "glitch": 3 },
            "unk_token": "[UNK]"
        }
    }"#;

    #[derive(Debug, Clone)]
    struct NoOptions;

    impl ModelOptions for NoOptions {
        fn cache_key(&self) -> String {
            "word-model".into()
        }
    }

    /// Scores by counting vocabulary hits; token 3 breaks the "backend".
    struct WordCountModel {
        labels: Vec<String>,
        device: candle_core::Device,
    }

    impl SentimentAnalysisModel for WordCountModel {
        type Options = NoOptions;

        async fn new(_options: NoOptions, _device: candle_core::Device) -> anyhow::Result<Self> {
            anyhow::bail!("constructed directly in tests")
        }

        async fn get_tokenizer(_options: NoOptions) -> anyhow::Result<Tokenizer> {
            anyhow::bail!("constructed directly in tests")
        }

        fn predict_probabilities(
            &self,
            token_ids: &[u32],
            _attention_mask: &[u32],
        ) -> Result<Vec<f32>, ClassificationError> {
            if token_ids.contains(&3) {
                return Err(ClassificationError::inference("shape mismatch"));
            }
            let positive = token_ids.iter().filter(|&&id| id == 1).count() as f32;
            let negative = token_ids.iter().filter(|&&id| id == 2).count() as f32;
            let total = positive + negative;
            if total == 0.0 {
                return Ok(vec![0.5, 0.5]);
            }
            Ok(vec![negative / total, positive / total])
        }

        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn device(&self) -> &candle_core::Device {
            &self.device
        }
    }

    fn pipeline(labels: &[&str]) -> SentimentAnalysisPipeline<WordCountModel> {
        SentimentAnalysisPipeline {
            model: WordCountModel {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                device: candle_core::Device::Cpu,
            },
            tokenizer: Tokenizer::from_str(WORD_TOKENIZER).unwrap(),
        }
    }

    #[test]
    fn picks_most_probable_label() {
        let pipeline = pipeline(&["negative", "positive"]);

        let prediction = pipeline.classify("great great awful").unwrap();
        assert_eq!(prediction.label, "positive");
        assert!((prediction.confidence - 2.0 / 3.0).abs() < 1e-6);

        let prediction = pipeline.classify("awful").unwrap();
        assert_eq!(prediction.label, "negative");
        assert_eq!(prediction.confidence, 1.0);
    }

    #[test]
    fn empty_encoding_is_a_preprocessing_error() {
        let err = pipeline(&["negative", "positive"]).classify("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Preprocessing);
    }

    #[test]
    fn backend_failure_is_an_inference_error() {
        let err = pipeline(&["negative", "positive"])
            .classify("great glitch")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Inference);
        assert_eq!(err.message, "shape mismatch");
    }

    #[test]
    fn undeclared_class_is_unknown() {
        let err = pipeline(&["negative"]).classify("great").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
    }

    #[test]
    fn same_text_always_same_prediction() {
        let pipeline = pipeline(&["negative", "positive"]);
        let first = pipeline.classify("great awful awful").unwrap();
        let second = pipeline.classify("great awful awful").unwrap();
        assert_eq!(first, second);
        assert_eq!(pipeline.labels(), vec!["negative", "positive"]);
    }
}
