//! Destinations for the single bulk write issued per batch.

use super::record::AnalysisRecord;
use crate::core::PersistenceError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// A store that accepts analysis records in bulk.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert all `records` in one round trip, returning them as stored.
    async fn bulk_insert(
        &self,
        records: Vec<AnalysisRecord>,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError>;

    /// Number of records held by the store.
    async fn count(&self) -> Result<usize, PersistenceError>;
}

/// Process-local store, mainly for tests and embedding.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<AnalysisRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AnalysisRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn bulk_insert(
        &self,
        records: Vec<AnalysisRecord>,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        self.records.lock().await.extend(records.iter().cloned());
        Ok(records)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.lock().await.len())
    }
}

/// Appends records as newline-delimited JSON, one write call per batch.
pub struct JsonLinesRecordStore {
    path: PathBuf,
    // Serialises appends from concurrent batches.
    write_lock: Mutex<()>,
}

impl JsonLinesRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record back. A missing file is an empty store.
    pub async fn load_all(&self) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(PersistenceError::from))
            .collect()
    }
}

#[async_trait]
impl RecordStore for JsonLinesRecordStore {
    async fn bulk_insert(
        &self,
        records: Vec<AnalysisRecord>,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        let mut buffer = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), count = records.len(), "appended analysis records");
        Ok(records)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.load_all().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(text: &str, label: &str) -> AnalysisRecord {
        AnalysisRecord {
            text: text.to_string(),
            label: label.to_string(),
            confidence: 0.75,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_accumulates_batches() {
        let store = InMemoryRecordStore::new();
        store.bulk_insert(vec![record("a", "positive")]).await.unwrap();
        store
            .bulk_insert(vec![record("b", "negative"), record("c", "neutral")])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.records().await[2].text, "c");
    }

    #[tokio::test]
    async fn json_lines_round_trips_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesRecordStore::new(dir.path().join("nested").join("analyses.jsonl"));
        assert_eq!(store.count().await.unwrap(), 0);

        let first = vec![record("multi\nline text", "positive")];
        store.bulk_insert(first.clone()).await.unwrap();
        store.bulk_insert(vec![record("later", "negative")]).await.unwrap();

        let stored = store.load_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], first[0]);
        assert_eq!(stored[1].label, "negative");
    }
}
