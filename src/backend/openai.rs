use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TransloomError};
use super::{api_key_from_env, require_key, Backend, Provider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if there is any.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// OpenAI-compatible chat completions; serves both OpenAI and OpenRouter.
pub struct OpenAiBackend {
    client: Client,
    provider: Provider,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiBackend {
    pub fn openai(client: Client, endpoint: &str, api_key_env: &str) -> Self {
        Self {
            client,
            provider: Provider::OpenAi,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key_from_env(api_key_env),
            api_key_env: api_key_env.to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4000),
        }
    }

    pub fn openrouter(client: Client, endpoint: &str, api_key_env: &str) -> Self {
        Self {
            client,
            provider: Provider::OpenRouter,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key_from_env(api_key_env),
            api_key_env: api_key_env.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn preflight(&self, _model: &str) -> Result<()> {
        require_key(&self.api_key, self.provider, &self.api_key_env).map(|_| ())
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, self.provider, &self.api_key_env)?;
        let provider = self.provider.to_str();

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Sending request to {} ({})", provider, model);

        let response = self.client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransloomError::Backend(format!("{} request failed: {}", provider, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("{} error for model {}: {}", provider, model, status);
            return Err(TransloomError::Backend(format!(
                "{} API error {}: {}", provider, status, error_text
            )));
        }

        let completion: ChatResponse = response.json().await
            .map_err(|e| TransloomError::Backend(format!("Failed to parse {} response: {}", provider, e)))?;

        completion
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| TransloomError::EmptyResponse(provider.to_string()))
    }
}
