pub mod cache;
pub mod config;
pub mod error;

pub use cache::{global_cache, ModelCache, ModelOptions};
pub use config::{BatchConfig, DeviceKind, ModelConfig, PipelineConfig, StoreConfig};
pub use error::{ClassificationError, ErrorKind, PersistenceError, RequestError};
