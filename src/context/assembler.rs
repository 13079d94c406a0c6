//! Context pack assembly
//!
//! Merges three signal sources with distinct scoring rules into one ranked,
//! size-bounded pack per query. The weighting is a deliberate policy: a user's
//! pin outranks automatic retrieval, which outranks raw chat recency.

use super::models::{
    ContextBucket, ContextItem, ContextPack, ItemSource, ScoreReason, SourceKind,
};
use super::token_estimator::TokenEstimator;
use crate::config::ContextConfig;
use crate::index::EmbeddingIndex;
use crate::llm::ChatMessage;
use crate::metrics::METRICS;
use crate::workspace::WorkspaceFiles;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const CHAT_WEIGHT: f64 = 0.35;
const RAG_WEIGHT: f64 = 0.55;
const PINNED_SCORE: f64 = 0.9;
const PINNED_PLACEHOLDER_SCORE: f64 = 0.6;
const RECENCY_TAU: f64 = 6.0;

const PROMPT_PREAMBLE: &str = "You are a coding assistant working inside the user's workspace.\n\
Use the context sections below when answering; prefer pinned files and retrieved code over conversation history.";

/// Inputs for one pack
#[derive(Default)]
pub struct PackRequest {
    pub query: String,
    /// Conversation history, oldest first
    pub chat: Vec<ChatMessage>,
    /// Explicitly pinned workspace paths
    pub pinned_files: Vec<String>,
    /// Pre-scored caller items, e.g. execution diagnostics
    pub extra_items: Vec<ContextItem>,
}

/// Builds one [`ContextPack`] per query from chat, pins, and retrieval
pub struct ContextAssembler {
    config: ContextConfig,
    index: Arc<EmbeddingIndex>,
    files: Arc<dyn WorkspaceFiles>,
    estimator: TokenEstimator,
}

impl ContextAssembler {
    pub fn new(
        config: ContextConfig,
        index: Arc<EmbeddingIndex>,
        files: Arc<dyn WorkspaceFiles>,
    ) -> Self {
        Self {
            config,
            index,
            files,
            estimator: TokenEstimator::new(),
        }
    }

    pub async fn build_context_pack(&self, request: PackRequest) -> ContextPack {
        let mut items = self.chat_items(&request.chat);
        items.extend(self.pinned_items(&request.pinned_files).await);
        items.extend(self.rag_items(&request.query).await);
        items.extend(request.extra_items);

        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items.truncate(self.config.max_items);

        let total_score = items.iter().map(|i| i.score).sum();
        let system_prompt = self.synthesize_prompt(&items);
        let estimated_tokens = self.estimator.estimate(&system_prompt);

        if estimated_tokens > self.config.max_prompt_tokens {
            warn!(
                "Context pack exceeds token ceiling: {} > {}",
                estimated_tokens, self.config.max_prompt_tokens
            );
            METRICS.pack_overflows.inc();
        }

        METRICS.packs_built.inc();
        debug!(
            "Assembled pack: {} items, ~{} tokens",
            items.len(),
            estimated_tokens
        );

        ContextPack {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            query: request.query,
            items,
            system_prompt,
            total_score,
            estimated_tokens,
        }
    }

    /// Recency-decayed chat turns. Distance is counted over the kept window
    /// (newest = 0); empty-text turns never reach the ranked list.
    fn chat_items(&self, chat: &[ChatMessage]) -> Vec<ContextItem> {
        chat.iter()
            .rev()
            .take(self.config.max_chat_turns)
            .enumerate()
            .filter(|(_, message)| !message.content.trim().is_empty())
            .map(|(distance, message)| {
                let recency = (-(distance as f64) / RECENCY_TAU).exp();
                ContextItem {
                    id: format!("chat#{}", distance),
                    bucket: ContextBucket::Immediate,
                    title: format!("Chat ({})", message.role),
                    content: message.content.clone(),
                    score: CHAT_WEIGHT * recency,
                    reason: ScoreReason {
                        recency: Some(recency),
                        ..ScoreReason::default()
                    },
                    source: ItemSource {
                        kind: SourceKind::Chat,
                        reference: None,
                    },
                }
            })
            .collect()
    }

    /// Pinned files. Unreadable pins stay visible as empty placeholders with a
    /// reduced score instead of failing assembly.
    async fn pinned_items(&self, pinned: &[String]) -> Vec<ContextItem> {
        let mut items = Vec::new();

        for path in pinned.iter().take(self.config.max_pinned_files) {
            let (content, score) = match self.files.read_file(path).await {
                Ok(content) => (content, PINNED_SCORE),
                Err(e) => {
                    warn!("Pinned file {} unavailable: {}", path, e);
                    (String::new(), PINNED_PLACEHOLDER_SCORE)
                }
            };

            items.push(ContextItem {
                id: format!("pinned:{}", path),
                bucket: ContextBucket::Working,
                title: path.clone(),
                content,
                score,
                reason: ScoreReason {
                    pinned: Some(true),
                    ..ScoreReason::default()
                },
                source: ItemSource {
                    kind: SourceKind::PinnedFile,
                    reference: Some(path.clone()),
                },
            });
        }

        items
    }

    /// Retrieved chunks with logistic-normalized relevance. The index already
    /// degrades to an empty hit list on failure, so assembly never aborts.
    async fn rag_items(&self, query: &str) -> Vec<ContextItem> {
        self.index
            .search(query, self.config.max_rag_chunks)
            .await
            .into_iter()
            .map(|hit| {
                let relevance = logistic(hit.score as f64);
                ContextItem {
                    id: hit.id,
                    bucket: ContextBucket::LongTerm,
                    title: hit.title,
                    content: hit.content,
                    score: RAG_WEIGHT * relevance,
                    reason: ScoreReason {
                        relevance: Some(relevance),
                        ..ScoreReason::default()
                    },
                    source: ItemSource {
                        kind: SourceKind::Rag,
                        reference: Some(hit.url),
                    },
                }
            })
            .collect()
    }

    fn synthesize_prompt(&self, items: &[ContextItem]) -> String {
        let mut sections = Vec::with_capacity(items.len() + 1);
        sections.push(PROMPT_PREAMBLE.to_string());

        for item in items {
            sections.push(format!("### {}\n{}", item.title, item.content));
        }

        sections.join("\n\n")
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
