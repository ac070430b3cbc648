//! Persistence of classification results.

pub mod materializer;
pub mod record;
pub mod store;

pub use materializer::{build_records, ResultMaterializer};
pub use record::AnalysisRecord;
pub use store::{InMemoryRecordStore, JsonLinesRecordStore, RecordStore};
