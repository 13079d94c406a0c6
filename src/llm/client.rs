//! OpenAI-compatible chat completions client

use super::{ChatMessage, GenerationRequest, GenerationService};
use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

const BASE_RETRY_DELAY_SECS: u64 = 2;

/// Chat completions client with retry on rate limits and transient failures
pub struct HttpGenerationClient {
    config: LlmConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl HttpGenerationClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: LlmConfig, api_key: SecretString) -> Result<Self> {
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

    fn build_messages(&self, request: &GenerationRequest) -> Vec<ChatMessage> {
        let mut messages = request.history.clone();
        messages.push(ChatMessage::user(request.message.clone()));
        messages
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let messages = self.build_messages(&request);

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self
                .client
                .post(&self.config.api_url)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.api_key.expose_secret()),
                )
                .header("Content-Type", "application/json")
                .json(&ChatRequest {
                    model,
                    messages: messages.clone(),
                    max_tokens: self.config.max_tokens,
                    temperature: self.config.temperature,
                })
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let chat_response: ChatResponse = response.json().await?;
                        return chat_response
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .ok_or_else(|| {
                                AssistantError::Generation("no choices in response".to_string())
                            });
                    }

                    let text = response.text().await.unwrap_or_default();

                    if Self::is_retryable(status) && attempt < self.config.max_retries {
                        let jitter_ms = rand::thread_rng().gen_range(0..1000);
                        let delay = Duration::from_secs(BASE_RETRY_DELAY_SECS << attempt)
                            + Duration::from_millis(jitter_ms);
                        warn!(
                            "Generation API returned {}, retrying in {:?} (attempt {})",
                            status,
                            delay,
                            attempt + 1
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(AssistantError::Generation(format!(
                            "API error {}: {}",
                            status, text
                        )));
                        continue;
                    }

                    error!("Generation API error {}: {}", status, text);
                    return Err(AssistantError::Generation(format!(
                        "API error {}: {}",
                        status, text
                    )));
                }
                Err(e) if attempt < self.config.max_retries => {
                    let jitter_ms = rand::thread_rng().gen_range(0..1000);
                    let delay = Duration::from_secs(BASE_RETRY_DELAY_SECS << attempt)
                        + Duration::from_millis(jitter_ms);
                    warn!("Generation request failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    last_error = Some(AssistantError::Http(e));
                }
                Err(e) => return Err(AssistantError::Http(e)),
            }
        }

        debug!("Generation retries exhausted");
        Err(last_error
            .unwrap_or_else(|| AssistantError::Generation("retries exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(url: String) -> HttpGenerationClient {
        let config = LlmConfig {
            api_url: url,
            max_retries: 0,
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        HttpGenerationClient::with_api_key(config, SecretString::from("test-key".to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_parses_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"hello from model"}}]}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let text = client
            .generate(GenerationRequest::new("hi"))
            .await
            .unwrap();

        assert_eq!(text, "hello from model");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(400)
            .with_body("bad request")
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.generate(GenerationRequest::new("hi")).await;

        assert!(matches!(err, Err(AssistantError::Generation(_))));
    }

    #[tokio::test]
    async fn test_generate_rate_limit_without_retries_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(429)
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.generate(GenerationRequest::new("hi")).await;

        assert!(matches!(err, Err(AssistantError::Generation(_))));
        mock.assert_async().await;
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(HttpGenerationClient::is_retryable(
            StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(HttpGenerationClient::is_retryable(
            StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(!HttpGenerationClient::is_retryable(StatusCode::BAD_REQUEST));
        assert!(!HttpGenerationClient::is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_build_messages_appends_user_turn() {
        let config = LlmConfig {
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client =
            HttpGenerationClient::with_api_key(config, SecretString::from("k".to_string()))
                .unwrap();

        let request = GenerationRequest::new("latest question")
            .with_history(vec![ChatMessage::assistant("earlier answer")]);
        let messages = client.build_messages(&request);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "latest question");
    }
}
