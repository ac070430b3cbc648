//! Sentiment analysis pipeline for classifying text emotional tone.
//!
//! A [`SentimentAnalysisPipeline`] owns one loaded model and its tokenizer and
//! implements [`Classifier`](crate::pipelines::Classifier), so it can be
//! handed to a [`BatchOrchestrator`](crate::pipelines::BatchOrchestrator).
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - model + tokenizer, classifies one text
//! - [`SentimentAnalysisPipelineBuilder`] - device and truncation configuration
//! - [`SentimentAnalysisModel`] - trait for sentiment model implementations
//! - [`ModernBertSize`] - available checkpoint sizes
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sentiment_pipelines::pipelines::sentiment_analysis_pipeline::*;
//! use sentiment_pipelines::pipelines::Classifier;
//!
//! # tokio_test::block_on(async {
//! let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base)
//!     .build()
//!     .await?;
//!
//! let prediction = pipeline.classify("I love this product!")?;
//! println!("{} ({:.2})", prediction.label, prediction.confidence);
//! # anyhow::Ok(())
//! # });
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::SentimentAnalysisPipeline;

pub use crate::models::{ModernBertSize, SentimentModernBertOptions};
