//! Runtime configuration for the batch pipeline.
//!
//! Sources are merged in priority order (lowest first):
//! built-in defaults, `./sentiment.toml`, an explicit config file, then
//! `SENTIMENT_` prefixed environment variables (`__` separates nested keys,
//! e.g. `SENTIMENT_BATCH__MAX_CONCURRENCY=4`).

use crate::models::ModernBertSize;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROJECT_CONFIG_FILE: &str = "sentiment.toml";
pub const ENV_PREFIX: &str = "SENTIMENT_";

/// Tunables for one orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of classifications running at once. `None` sizes the
    /// limit to the available parallelism of the host.
    pub max_concurrency: Option<usize>,
    /// Wall-clock budget for a whole batch, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl BatchConfig {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Effective concurrency limit, never zero.
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Where inference runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// CUDA 0 when available, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub size: ModernBertSize,
    /// Overrides the hub repository implied by `size`.
    pub repo: Option<String>,
    pub device: DeviceKind,
    pub cuda_index: usize,
    /// Token budget per text; longer inputs are truncated.
    pub max_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size: ModernBertSize::Base,
            repo: None,
            device: DeviceKind::Auto,
            cuda_index: 0,
            max_length: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON-lines file that receives persisted analysis records.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("analyses.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub batch: BatchConfig,
    pub store: StoreConfig,
}

impl PipelineConfig {
    /// Load configuration from all sources.
    pub fn load(config_path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(PipelineConfig::default()));

        let project = PathBuf::from(PROJECT_CONFIG_FILE);
        if project.exists() {
            figment = figment.merge(Toml::file(&project));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_sources() {
        figment::Jail::expect_with(|_jail| {
            let config: PipelineConfig = PipelineConfig::figment(None).extract()?;
            assert_eq!(config, PipelineConfig::default());
            assert_eq!(config.model.max_length, 512);
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [model]
                size = "large"
                device = "cpu"

                [batch]
                max_concurrency = 2
                timeout_ms = 1500
                "#,
            )?;
            jail.set_env("SENTIMENT_BATCH__MAX_CONCURRENCY", "8");

            let config: PipelineConfig =
                PipelineConfig::figment(Some(Path::new("custom.toml"))).extract()?;
            assert_eq!(config.model.size, ModernBertSize::Large);
            assert_eq!(config.model.device, DeviceKind::Cpu);
            assert_eq!(config.batch.max_concurrency, Some(8));
            assert_eq!(config.batch.timeout(), Some(Duration::from_millis(1500)));
            Ok(())
        });
    }

    #[test]
    fn concurrency_limit_is_never_zero() {
        let config = BatchConfig::default().with_max_concurrency(0);
        assert_eq!(config.concurrency_limit(), 1);
        assert!(BatchConfig::default().concurrency_limit() >= 1);
    }
}
