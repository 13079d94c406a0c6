//! Configuration for the assistant core

use crate::error::{AssistantError, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generation service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Workspace indexing configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Context assembly configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load from an optional TOML file layered with `ASSISTANT_`-prefixed
    /// environment variables (e.g. `ASSISTANT_LLM__MODEL`).
    pub fn load(path: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ASSISTANT").separator("__"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AssistantError::Configuration(e.to_string()))
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ASSISTANT_LLM_MODEL") {
            config.llm.model = val;
        }

        if let Ok(val) = std::env::var("ASSISTANT_LLM_API_URL") {
            config.llm.api_url = val;
        }

        if let Ok(val) = std::env::var("ASSISTANT_EMBEDDING_MODEL") {
            config.embedding.model = val;
        }

        if let Ok(val) = std::env::var("ASSISTANT_MAX_ATTEMPTS") {
            if let Ok(num) = val.parse() {
                config.agent.max_attempts = num;
            }
        }

        if let Ok(val) = std::env::var("ASSISTANT_INTERPRETER") {
            config.agent.interpreter = val;
        }

        config
    }
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Chat completions endpoint
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    /// API key environment variable
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Max completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries for rate-limited or transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gpt-4".to_string()
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> u32 {
    3
}

fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_url: default_llm_api_url(),
            api_key_env: default_llm_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<SecretString> {
        std::env::var(&self.api_key_env)
            .map(SecretString::from)
            .map_err(|_| {
                AssistantError::Configuration(format!("{} is not set", self.api_key_env))
            })
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embeddings endpoint
    #[serde(default = "default_embedding_api_url")]
    pub api_url: String,

    /// API key environment variable
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Expected vector dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Embedding cache capacity (entries)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_api_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_embedding_timeout() -> u64 {
    10
}

fn default_cache_capacity() -> u64 {
    10_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_url: default_embedding_api_url(),
            api_key_env: default_llm_api_key_env(),
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<SecretString> {
        std::env::var(&self.api_key_env)
            .map(SecretString::from)
            .map_err(|_| {
                AssistantError::Configuration(format!("{} is not set", self.api_key_env))
            })
    }
}

/// Workspace indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Lines per fallback chunk window
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,

    /// File name patterns excluded from workspace indexing
    #[serde(default = "default_excluded_patterns")]
    pub excluded_patterns: Vec<String>,
}

fn default_window_lines() -> usize {
    20
}

fn default_excluded_patterns() -> Vec<String> {
    [
        "*.png", "*.jpg", "*.jpeg", "*.gif", "*.ico", "*.svg", "*.pdf", "*.zip", "*.gz",
        "*.tar", "*.exe", "*.dll", "*.so", "*.dylib", "*.woff", "*.woff2", "*.ttf", "*.eot",
        "*.mp3", "*.mp4", "*.wasm", "*.bin", "*.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            window_lines: default_window_lines(),
            excluded_patterns: default_excluded_patterns(),
        }
    }
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Chat turns considered for recency scoring
    #[serde(default = "default_max_chat_turns")]
    pub max_chat_turns: usize,

    /// Pinned files read per pack
    #[serde(default = "default_max_pinned_files")]
    pub max_pinned_files: usize,

    /// Retrieved chunks requested per pack
    #[serde(default = "default_max_rag_chunks")]
    pub max_rag_chunks: usize,

    /// Ranked items kept per pack
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Soft ceiling for the synthesized prompt, in tokens
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
}

fn default_max_chat_turns() -> usize {
    10
}

fn default_max_pinned_files() -> usize {
    5
}

fn default_max_rag_chunks() -> usize {
    6
}

fn default_max_items() -> usize {
    16
}

fn default_max_prompt_tokens() -> usize {
    8000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chat_turns: default_max_chat_turns(),
            max_pinned_files: default_max_pinned_files(),
            max_rag_chunks: default_max_rag_chunks(),
            max_items: default_max_items(),
            max_prompt_tokens: default_max_prompt_tokens(),
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Full generate/execute cycles per task
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Interpreter invoked against the generated file
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Filename used when the generation carries no marker line
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_filename() -> String {
    "main.py".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interpreter: default_interpreter(),
            default_filename: default_filename(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_attempts, 3);
        assert_eq!(config.index.window_lines, 20);
        assert_eq!(config.context.max_items, 16);
        assert_eq!(config.context.max_chat_turns, 10);
        assert_eq!(config.context.max_pinned_files, 5);
        assert_eq!(config.context.max_rag_chunks, 6);
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_excluded_patterns_cover_binaries() {
        let config = IndexConfig::default();
        assert!(config.excluded_patterns.iter().any(|p| p == "*.png"));
        assert!(config.excluded_patterns.iter().any(|p| p == "*.wasm"));
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = LlmConfig {
            api_key_env: "ASSISTANT_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(config.resolve_api_key().is_err());
    }
}
