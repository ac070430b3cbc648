use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted form of a successful classification. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub text: String,
    pub label: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for AnalysisRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview: String = self.text.chars().take(20).collect();
        if preview.len() < self.text.len() {
            write!(f, "{preview}...")
        } else {
            write!(f, "{preview}")
        }
    }
}
