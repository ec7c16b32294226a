use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TransloomError};
use super::{api_key_from_env, require_key, Backend, Provider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Google Gemini `generateContent`.
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiBackend {
    pub fn new(client: Client, endpoint: &str, api_key_env: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key_from_env(api_key_env),
            api_key_env: api_key_env.to_string(),
        }
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn preflight(&self, _model: &str) -> Result<()> {
        require_key(&self.api_key, Provider::Gemini, &self.api_key_env).map(|_| ())
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, Provider::Gemini, &self.api_key_env)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        debug!("Sending request to {}...", model);

        let response = self.client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| TransloomError::Backend(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gemini error for model {}: {}", model, status);
            return Err(TransloomError::Backend(format!(
                "Gemini API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateContentResponse = response.json().await
            .map_err(|e| TransloomError::Backend(format!("Failed to parse Gemini response: {}", e)))?;

        generated
            .text()
            .ok_or_else(|| TransloomError::EmptyResponse("Gemini".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![],
            generation_config: GenerationConfig::default(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Xin "},{"text":"chào"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Xin chào"));

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.text(), None);
    }
}
