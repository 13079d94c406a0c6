//! Embedding model contract and clients

use crate::config::EmbeddingConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text embedding model with a fixed output dimension
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Warm up the model. Called once through the index's single-flight init;
    /// a failure here leaves the index degraded but usable.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Embed one text into a `dimension()`-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// OpenAI-compatible embeddings client
pub struct HttpEmbedder {
    config: EmbeddingConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: EmbeddingConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn prepare(&self) -> Result<()> {
        // Probe the service so a bad endpoint or key fails at init time, and
        // the advertised dimension is verified before anything is stored.
        let vector = self.embed("embedding model warm-up probe").await?;
        if vector.len() != self.config.dimension {
            return Err(AssistantError::Embedding(format!(
                "model returned dimension {}, expected {}",
                vector.len(),
                self.config.dimension
            )));
        }
        debug!("Embedding model ready, dimension {}", vector.len());
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Embedding(format!(
                "API error {}: {}",
                status, text
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AssistantError::Embedding("empty embedding response".to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Content-addressed cache in front of any [`Embedder`], so re-indexing
/// unchanged chunks does not re-embed them
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: moka::future::Cache<String, Vec<f32>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: u64) -> Self {
        Self {
            inner,
            cache: moka::future::Cache::new(capacity),
        }
    }

    fn content_key(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn prepare(&self) -> Result<()> {
        self.inner.prepare().await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::content_key(text);

        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let vector = self.inner.embed(text).await?;
        self.cache.insert(key, vector.clone()).await;
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
