//! OpenAI-compatible chat completions client.
//!
//! Only the subset the simulation needs: one system message, one user
//! message, a single text completion back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use negotiation_core::LlmConfig;

/// A message in a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Sampling parameters for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelParams {
    /// Parameters from configuration, optionally overriding the model name.
    pub fn from_config(config: &LlmConfig, model: Option<&str>) -> Self {
        Self {
            model: model.unwrap_or(&config.model).to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Body of `POST {base}/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(params: &ModelParams, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: params.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Text of the first choice, if it has any.
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Anything that can turn a chat request into completion text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Errors from the model backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("environment variable {0} holding the API key is not set")]
    MissingApiKey(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// HTTP client for an OpenAI-compatible endpoint.
pub struct ChatClient {
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl ChatClient {
    pub fn new(api_base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: format!("{}/chat/completions", api_base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            http_client,
        })
    }

    /// Builds a client from configuration, reading the key from the
    /// environment variable named by `api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            &config.api_base_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.into_text().ok_or(LlmError::EmptyCompletion)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
