use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of reasons a single text could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tokenization or encoding of the input failed.
    Preprocessing,
    /// The inference backend itself faulted (resource exhaustion, bad tensor shapes, ...).
    Inference,
    /// The batch deadline passed before this item finished.
    Timeout,
    /// Anything that does not fit the categories above.
    Unknown,
}

impl ErrorKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Preprocessing => "preprocessing error",
            ErrorKind::Inference => "inference error",
            ErrorKind::Timeout => "timeout error",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-item classification failure carrying a human readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassificationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassificationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn preprocessing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Preprocessing, message)
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inference, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }
}

impl From<candle_core::Error> for ClassificationError {
    fn from(value: candle_core::Error) -> Self {
        ClassificationError::inference(value.to_string())
    }
}

/// Failure of the single bulk write performed at the end of a batch.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("outcome count {outcomes} does not match text count {texts}")]
    Misaligned { texts: usize, outcomes: usize },

    #[error("record store rejected bulk write: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Client-side request problems, rejected before any classification happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing \"texts\" field in request data")]
    MissingTexts,
}
