pub mod core;
pub mod loaders;
pub mod models;
pub mod pipelines;

// Re-export the types most callers need to wire a batch service.
pub use crate::core::{
    BatchConfig, ClassificationError, ErrorKind, PersistenceError, PipelineConfig, RequestError,
};
pub use crate::models::{ModernBertSize, SentimentModernBertModel};
pub use crate::pipelines::{
    AnalysisRecord, BatchOrchestrator, BulkAnalysisRequest, BulkAnalysisService, Classifier,
    Outcome, Prediction, ResultMaterializer,
};
