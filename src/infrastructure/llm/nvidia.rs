use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::LlmConfig;

/// Chat-completion client for the NVIDIA hosted, OpenAI-compatible API.
pub struct NvidiaLlm {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl NvidiaLlm {
    /// Reads the API key from the variable named by `config.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(variable = %config.api_key_env, "LLM API key not set, queries will be rejected");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

fn failure_message<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: Result<String, E>,
) -> String {
    match body {
        Ok(body) => format!("{status}: {body}"),
        Err(e) => format!("{status} (response body unreadable: {e})"),
    }
}

#[async_trait]
impl LlmService for NvidiaLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::missing_credential(&self.api_key_env))?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await;
            warn!(%status, "completion request failed");
            return Err(DomainError::remote(failure_message(status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DomainError::remote(format!("invalid completion response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| DomainError::remote("completion response contained no choices"))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
