//! Command line front end: classify a batch of texts and print the response
//! as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use sentiment_pipelines::core::PipelineConfig;
use sentiment_pipelines::pipelines::sentiment_analysis_pipeline::SentimentAnalysisPipelineBuilder;
use sentiment_pipelines::pipelines::utils::DeviceRequest;
use sentiment_pipelines::pipelines::{
    BatchOrchestrator, BulkAnalysisRequest, BulkAnalysisService, JsonLinesRecordStore,
    ResultMaterializer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sentiment-batch",
    version,
    about = "Classify the sentiment of a batch of texts"
)]
struct Cli {
    /// Texts to classify
    texts: Vec<String>,

    /// Read texts from a file, one per line
    #[arg(long, conflicts_with = "json")]
    file: Option<PathBuf>,

    /// Read a `{"texts": [...]}` request body from stdin
    #[arg(long)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force CPU inference
    #[arg(long)]
    cpu: bool,

    /// Maximum classifications running at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Wall-clock budget for the whole batch, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON-lines file receiving persisted records
    #[arg(long)]
    store: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if self.cpu {
            config.model.device = sentiment_pipelines::core::DeviceKind::Cpu;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.batch.max_concurrency = Some(max_concurrency);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.batch.timeout_ms = Some(timeout_ms);
        }
        if let Some(store) = &self.store {
            config.store.path = store.clone();
        }
    }

    fn request(&self) -> Result<BulkAnalysisRequest> {
        if self.json {
            return serde_json::from_reader(std::io::stdin().lock())
                .context("Failed to parse request body from stdin");
        }
        if let Some(path) = &self.file {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read texts from {path:?}"))?;
            let texts = content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect();
            return Ok(BulkAnalysisRequest::new(texts));
        }
        Ok(BulkAnalysisRequest::new(self.texts.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = PipelineConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;
    cli.apply_overrides(&mut config);
    let request = cli.request()?;

    let builder = match &config.model.repo {
        Some(repo) => SentimentAnalysisPipelineBuilder::modernbert_repo(repo),
        None => SentimentAnalysisPipelineBuilder::modernbert(config.model.size),
    };
    let pipeline = builder
        .device_request(DeviceRequest::from_config(
            config.model.device,
            config.model.cuda_index,
        ))
        .max_length(config.model.max_length)
        .build()
        .await?;
    info!(device = ?pipeline.device(), "pipeline ready");

    let orchestrator = BatchOrchestrator::new(Arc::new(pipeline), config.batch.clone());
    let store = Arc::new(JsonLinesRecordStore::new(config.store.path.clone()));
    let service = BulkAnalysisService::new(orchestrator, ResultMaterializer::new(store));

    let response = service.analyze(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
