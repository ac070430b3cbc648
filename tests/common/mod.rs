#![allow(dead_code)]

use async_trait::async_trait;
use sentiment_pipelines::core::{ClassificationError, ErrorKind, PersistenceError};
use sentiment_pipelines::pipelines::{
    AnalysisRecord, Classifier, InMemoryRecordStore, Prediction, RecordStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic classifier driven by a lookup table.
///
/// Unknown texts are classified `neutral` at 0.5. Tracks call counts and the
/// peak number of concurrent calls.
#[derive(Default)]
pub struct StubClassifier {
    responses: HashMap<String, Result<Prediction, ClassificationError>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, text: &str, label: &str, confidence: f32) -> Self {
        self.responses
            .insert(text.to_string(), Ok(Prediction::new(label, confidence)));
        self
    }

    pub fn fail(mut self, text: &str, kind: ErrorKind, message: &str) -> Self {
        self.responses
            .insert(text.to_string(), Err(ClassificationError::new(kind, message)));
        self
    }

    pub fn delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, text: &str) -> Result<Prediction, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(text) {
            std::thread::sleep(*delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .get(text)
            .cloned()
            .unwrap_or_else(|| Ok(Prediction::new("neutral", 0.5)))
    }

    fn labels(&self) -> Vec<String> {
        vec!["negative".into(), "neutral".into(), "positive".into()]
    }
}

/// In-memory store that also counts bulk insert round trips.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryRecordStore,
    bulk_calls: AtomicUsize,
}

impl RecordingStore {
    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn bulk_insert(
        &self,
        records: Vec<AnalysisRecord>,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk_insert(records).await
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        self.inner.count().await
    }
}

/// Store whose every write is rejected.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn bulk_insert(
        &self,
        _records: Vec<AnalysisRecord>,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        Err(PersistenceError::Store("connection refused".into()))
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(0)
    }
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| t.to_string()).collect()
}
