//! Hugging Face Hub loaders for classifier artifacts.
//!
//! - [`HfLoader`] - fetches one file from a hub repository, retrying on
//!   lock contention in the local hub cache
//! - [`TokenizerLoader`] - loads a `tokenizer.json`
//! - [`ModelConfigLoader`] - reads a model's `config.json`
//! - [`WeightsLoader`] - resolves the weights file (`model.safetensors`, falling
//!   back to `pytorch_model.bin`)
//!
//! Artifacts are fetched once at pipeline build time, never per classification.

use anyhow::Context;
use hf_hub::api::tokio::ApiBuilder;
use std::path::PathBuf;
use std::time::Duration;
use tokenizers::Tokenizer;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        let api = ApiBuilder::new().with_chunk_size(None).build()?;
        let repo = api.model(self.repo.clone());

        let mut attempt = 0;
        loop {
            match repo.get(self.filename.as_str()).await {
                Ok(path) => return Ok(path),
                Err(e) if e.to_string().contains("Lock acquisition failed")
                    && attempt + 1 < MAX_RETRIES =>
                {
                    let wait = Duration::from_millis(100 * (1 << attempt));
                    tracing::debug!(
                        repo = %self.repo,
                        file = %self.filename,
                        attempt,
                        "hub cache locked, retrying in {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to fetch {} from {}", self.filename, self.repo)
                    })
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            tokenizer_file_loader: HfLoader::new(repo, filename),
        }
    }

    pub async fn load(&self) -> anyhow::Result<Tokenizer> {
        let path = self.tokenizer_file_loader.load().await?;
        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("Failed to load tokenizer {path:?}: {e}"))
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfigLoader {
    pub config_file_loader: HfLoader,
}

impl ModelConfigLoader {
    pub fn new(repo: &str) -> Self {
        Self {
            config_file_loader: HfLoader::new(repo, "config.json"),
        }
    }

    /// Raw `config.json` contents; callers deserialise the parts they need.
    pub async fn load(&self) -> anyhow::Result<String> {
        let path = self.config_file_loader.load().await?;
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {path:?}"))
    }
}

#[derive(Debug, Clone)]
pub struct WeightsLoader {
    pub repo: String,
}

impl WeightsLoader {
    pub fn new(repo: &str) -> Self {
        Self { repo: repo.into() }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        match HfLoader::new(&self.repo, "model.safetensors").load().await {
            Ok(path) => Ok(path),
            Err(safetensors_err) => HfLoader::new(&self.repo, "pytorch_model.bin")
                .load()
                .await
                .with_context(|| {
                    format!(
                        "Model weights not found in repo {}. Expected `model.safetensors` or `pytorch_model.bin` ({safetensors_err})",
                        self.repo
                    )
                }),
        }
    }
}
