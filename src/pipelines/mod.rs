// Pipeline modules organized by functionality
pub mod batch_pipeline;
pub mod bulk_analysis;
pub mod classifier;
pub mod persistence;
pub mod sentiment_analysis_pipeline;
pub mod utils;

pub use batch_pipeline::{BatchOrchestrator, BatchOutput, BatchStats, Outcome};
pub use bulk_analysis::{AnalysisEntry, BulkAnalysisRequest, BulkAnalysisResponse, BulkAnalysisService};
pub use classifier::{Classifier, Prediction};
pub use persistence::{
    AnalysisRecord, InMemoryRecordStore, JsonLinesRecordStore, RecordStore, ResultMaterializer,
};
pub use sentiment_analysis_pipeline::{SentimentAnalysisPipeline, SentimentAnalysisPipelineBuilder};
