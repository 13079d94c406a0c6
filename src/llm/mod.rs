//! Generation service contract and HTTP client

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;

pub use client::HttpGenerationClient;

/// One turn of conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One generation call: a message, optional history, optional model override
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            model: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Text generation service (chat/completion)
///
/// Implementations return free text; callers extract fenced code blocks or use
/// the raw text verbatim.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
