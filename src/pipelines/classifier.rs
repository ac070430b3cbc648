use crate::core::ClassificationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A sentiment judgment for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Certainty in `label`, within `[0.0, 1.0]`.
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Whether the confidence is a finite probability.
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Text to sentiment capability.
///
/// Implementations hold read-only model state and are shared across
/// concurrent calls without locking. `classify` is blocking and compute bound;
/// the batch orchestrator moves it off the async runtime.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Prediction, ClassificationError>;

    /// The closed label set this classifier can emit.
    fn labels(&self) -> Vec<String>;
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn classify(&self, text: &str) -> Result<Prediction, ClassificationError> {
        (**self).classify(text)
    }

    fn labels(&self) -> Vec<String> {
        (**self).labels()
    }
}
