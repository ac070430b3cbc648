use super::outcome::Outcome;
use super::stats::BatchStats;
use crate::core::{BatchConfig, ClassificationError};
use crate::pipelines::classifier::{Classifier, Prediction};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ordered outcomes of one batch plus its stats.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// `outcomes[i]` belongs to `texts[i]`.
    pub outcomes: Vec<Outcome>,
    pub stats: BatchStats,
}

/// Runs a classifier over a batch of texts concurrently.
///
/// Every input position gets exactly one [`Outcome`], recombined by index, no
/// matter in which order the classifications finish or how many of them fail.
/// At most `max_concurrency` classifications run at once; the rest wait for a
/// slot. The limiter is shared by every batch run through one orchestrator.
pub struct BatchOrchestrator {
    classifier: Arc<dyn Classifier>,
    permits: Arc<Semaphore>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, config: BatchConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency_limit()));
        Self {
            classifier,
            permits,
            config,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Classify `texts`, returning one outcome per text in input order.
    pub async fn run(&self, texts: &[String]) -> Vec<Outcome> {
        self.run_with_stats(texts).await.outcomes
    }

    pub async fn run_with_stats(&self, texts: &[String]) -> BatchOutput {
        let stats = BatchStats::start();
        if texts.is_empty() {
            return BatchOutput {
                outcomes: Vec::new(),
                stats: stats.finish(&[]),
            };
        }

        let deadline = self.config.timeout().map(|budget| Instant::now() + budget);
        let mut join_set = JoinSet::new();
        for (index, text) in texts.iter().enumerate() {
            let classifier = Arc::clone(&self.classifier);
            let permits = Arc::clone(&self.permits);
            let text = text.clone();
            join_set.spawn(async move { (index, classify_isolated(classifier, permits, text).await) });
        }

        let mut slots: Vec<Option<Outcome>> = vec![None; texts.len()];
        let mut deadline_passed = false;
        loop {
            let joined = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            deadline_passed = true;
                            join_set.abort_all();
                            break;
                        }
                    }
                }
                None => join_set.join_next().await,
            };

            match joined {
                Some(Ok((index, outcome))) => {
                    match &outcome {
                        Outcome::Success(p) => {
                            debug!(index, label = %p.label, confidence = p.confidence, "classified")
                        }
                        Outcome::Failure(e) => warn!(index, kind = %e.kind, "classification failed: {}", e.message),
                    }
                    slots[index] = Some(outcome);
                }
                Some(Err(e)) => warn!("classification task did not complete: {e}"),
                None => break,
            }
        }

        let outcomes: Vec<Outcome> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Outcome::Failure(if deadline_passed {
                        ClassificationError::timeout("batch deadline exceeded before classification finished")
                    } else {
                        ClassificationError::unknown("classification task ended without an outcome")
                    })
                })
            })
            .collect();

        let stats = stats.finish(&outcomes);
        info!(
            items = stats.items_processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            timed_out = stats.timed_out,
            elapsed = ?stats.total_time,
            "batch classified"
        );
        BatchOutput { outcomes, stats }
    }
}

/// Classify one text on the blocking pool once a concurrency slot is free.
///
/// Never panics and never returns early: every failure becomes a
/// [`Outcome::Failure`].
async fn classify_isolated(
    classifier: Arc<dyn Classifier>,
    permits: Arc<Semaphore>,
    text: String,
) -> Outcome {
    let permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return Outcome::Failure(ClassificationError::unknown("concurrency limiter closed"))
        }
    };

    // The permit travels with the blocking work so an abandoned (timed out)
    // inference still holds its slot until it actually finishes.
    let handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        match panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(&text))) {
            Ok(result) => result.and_then(check_confidence),
            Err(payload) => Err(ClassificationError::inference(format!(
                "classifier panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    });

    match handle.await {
        Ok(result) => Outcome::from(result),
        Err(e) => Outcome::Failure(ClassificationError::unknown(format!(
            "classification task failed: {e}"
        ))),
    }
}

fn check_confidence(prediction: Prediction) -> Result<Prediction, ClassificationError> {
    if prediction.has_valid_confidence() {
        Ok(prediction)
    } else {
        Err(ClassificationError::inference(format!(
            "confidence {} for label '{}' is outside [0, 1]",
            prediction.confidence, prediction.label
        )))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
