use super::record::AnalysisRecord;
use super::store::RecordStore;
use crate::core::PersistenceError;
use crate::pipelines::batch_pipeline::Outcome;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Turns a finished batch into persisted records.
///
/// Only successes are persisted. Call [`persist`](Self::persist) after the
/// orchestrator has returned, never while classifications are in flight.
pub struct ResultMaterializer {
    store: Arc<dyn RecordStore>,
}

impl ResultMaterializer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Persist the successful outcomes of a batch in a single bulk write.
    ///
    /// A batch without successes writes nothing.
    pub async fn persist(
        &self,
        texts: &[String],
        outcomes: &[Outcome],
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        let records = build_records(texts, outcomes, Utc::now())?;
        if records.is_empty() {
            tracing::debug!("no successful outcomes to persist");
            return Ok(records);
        }

        let count = records.len();
        let stored = self.store.bulk_insert(records).await?;
        tracing::info!(count, "persisted analysis records");
        Ok(stored)
    }
}

/// Pair each success with its text, skipping failures.
pub fn build_records(
    texts: &[String],
    outcomes: &[Outcome],
    created_at: DateTime<Utc>,
) -> Result<Vec<AnalysisRecord>, PersistenceError> {
    if texts.len() != outcomes.len() {
        return Err(PersistenceError::Misaligned {
            texts: texts.len(),
            outcomes: outcomes.len(),
        });
    }

    Ok(texts
        .iter()
        .zip(outcomes)
        .filter_map(|(text, outcome)| {
            outcome.prediction().map(|prediction| AnalysisRecord {
                text: text.clone(),
                label: prediction.label.clone(),
                confidence: prediction.confidence,
                created_at,
            })
        })
        .collect())
}
