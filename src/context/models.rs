//! Data models for context assembly

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Memory tier a context item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextBucket {
    /// Recent conversation turns
    Immediate,
    /// Files the user deliberately pinned
    Working,
    /// Retrieved index material
    LongTerm,
    /// Caller-injected artifacts such as execution diagnostics
    Artifacts,
}

/// Where an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Chat,
    PinnedFile,
    Rag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Signal breakdown behind an item's score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreReason {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_affinity: Option<f64>,
}

/// One scored candidate for the prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub bucket: ContextBucket,
    pub title: String,
    pub content: String,
    /// Weighted, bucket-specific contribution; comparable only after scoring
    pub score: f64,
    pub reason: ScoreReason,
    pub source: ItemSource,
}

/// Ranked, size-bounded bundle of context for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPack {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub query: String,
    /// Sorted descending by score, truncated to the configured cap
    pub items: Vec<ContextItem>,
    /// Deterministic concatenation of `items` in rank order
    pub system_prompt: String,
    /// Sum of kept item scores, informational
    pub total_score: f64,
    /// Estimated prompt size in tokens, informational
    pub estimated_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serialization_shape() {
        let source = ItemSource {
            kind: SourceKind::PinnedFile,
            reference: Some("src/app.py".to_string()),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "pinned_file");
        assert_eq!(json["ref"], "src/app.py");

        let source = ItemSource {
            kind: SourceKind::Chat,
            reference: None,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert!(json.get("ref").is_none());
    }
}
