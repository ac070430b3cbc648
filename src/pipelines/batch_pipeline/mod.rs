//! Concurrent batch classification with per-item failure isolation.
//!
//! [`BatchOrchestrator`] fans a batch of texts out to a shared
//! [`Classifier`](crate::pipelines::Classifier), bounds how many inferences run
//! at once, and recombines the results by input index. A failing, panicking or
//! timed out item only affects its own position in the output.
//!
//! ```rust,no_run
//! use sentiment_pipelines::core::BatchConfig;
//! use sentiment_pipelines::pipelines::sentiment_analysis_pipeline::*;
//! use sentiment_pipelines::pipelines::batch_pipeline::BatchOrchestrator;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base)
//!     .build()
//!     .await?;
//! let orchestrator = BatchOrchestrator::new(
//!     Arc::new(pipeline),
//!     BatchConfig::default()
//!         .with_max_concurrency(4)
//!         .with_timeout(Duration::from_secs(30)),
//! );
//!
//! let texts = vec!["Best purchase ever!".to_string(), "Terrible.".to_string()];
//! for (text, outcome) in texts.iter().zip(orchestrator.run(&texts).await) {
//!     println!("{text}: {outcome:?}");
//! }
//! # anyhow::Ok(())
//! # });
//! ```

pub mod orchestrator;
pub mod outcome;
pub mod stats;

pub use orchestrator::{BatchOrchestrator, BatchOutput};
pub use outcome::Outcome;
pub use stats::BatchStats;
