//! Request/response boundary for "classify a batch".
//!
//! A [`BulkAnalysisService`] validates the request, runs the batch, persists the
//! successes and renders one entry per submitted text. Partial failure is a
//! normal response: callers inspect each entry, not a batch-wide status.

use crate::core::{ClassificationError, RequestError};
use crate::pipelines::batch_pipeline::{BatchOrchestrator, BatchOutput, BatchStats, Outcome};
use crate::pipelines::persistence::ResultMaterializer;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAnalysisRequest {
    #[serde(default)]
    pub texts: Option<Vec<String>>,
}

impl BulkAnalysisRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts: Some(texts) }
    }
}

/// One rendered result, positionally aligned with the request's texts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisEntry {
    Analyzed {
        text: String,
        label: String,
        confidence: f32,
    },
    Failed {
        text: String,
        error: ClassificationError,
    },
}

impl AnalysisEntry {
    pub fn text(&self) -> &str {
        match self {
            AnalysisEntry::Analyzed { text, .. } | AnalysisEntry::Failed { text, .. } => text,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self, AnalysisEntry::Analyzed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAnalysisResponse {
    pub results: Vec<AnalysisEntry>,
    /// Records written by the bulk insert.
    pub persisted: usize,
    /// Set when the bulk insert failed; `results` are complete regardless.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
    pub stats: BatchStats,
}

/// Zip texts with their outcomes into response entries, preserving order.
pub fn assemble_entries(texts: Vec<String>, outcomes: Vec<Outcome>) -> Vec<AnalysisEntry> {
    texts
        .into_iter()
        .zip(outcomes)
        .map(|(text, outcome)| match outcome {
            Outcome::Success(prediction) => AnalysisEntry::Analyzed {
                text,
                label: prediction.label,
                confidence: prediction.confidence,
            },
            Outcome::Failure(error) => AnalysisEntry::Failed { text, error },
        })
        .collect()
}

pub struct BulkAnalysisService {
    orchestrator: BatchOrchestrator,
    materializer: ResultMaterializer,
}

impl BulkAnalysisService {
    pub fn new(orchestrator: BatchOrchestrator, materializer: ResultMaterializer) -> Self {
        Self {
            orchestrator,
            materializer,
        }
    }

    /// Classify and persist a batch.
    ///
    /// A missing or empty `texts` list is rejected without touching the
    /// classifier. Persistence failures are reported in the response.
    pub async fn analyze(
        &self,
        request: BulkAnalysisRequest,
    ) -> Result<BulkAnalysisResponse, RequestError> {
        let texts = match request.texts {
            Some(texts) if !texts.is_empty() => texts,
            _ => return Err(RequestError::MissingTexts),
        };

        let BatchOutput { outcomes, stats } = self.orchestrator.run_with_stats(&texts).await;

        let (persisted, persistence_error) =
            match self.materializer.persist(&texts, &outcomes).await {
                Ok(records) => (records.len(), None),
                Err(e) => {
                    warn!("bulk persist failed, returning unpersisted results: {e}");
                    (0, Some(e.to_string()))
                }
            };

        Ok(BulkAnalysisResponse {
            results: assemble_entries(texts, outcomes),
            persisted,
            persistence_error,
            stats,
        })
    }
}
