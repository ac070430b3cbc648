use crate::core::ClassificationError;
use crate::pipelines::classifier::Prediction;
use serde::Serialize;

/// Result for one input position: a prediction or a typed failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success(Prediction),
    Failure(ClassificationError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Outcome::Success(prediction) => Some(prediction),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ClassificationError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }
}

impl From<Result<Prediction, ClassificationError>> for Outcome {
    fn from(result: Result<Prediction, ClassificationError>) -> Self {
        match result {
            Ok(prediction) => Outcome::Success(prediction),
            Err(error) => Outcome::Failure(error),
        }
    }
}
