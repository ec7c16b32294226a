// Model backend gateway
//
// One trait, several HTTP clients, and a router that picks the client from
// the model identifier passed with each call:
// - gemini-*        -> Gemini generateContent
// - gpt-*           -> OpenAI chat completions
// - vendor/model    -> OpenRouter chat completions
// - anything else   -> local Ollama

pub mod gemini;
pub mod ollama;
pub mod openai;

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{Result, TransloomError};

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Sends one prompt to a language model and returns its raw text reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fail fast when the backend serving `model` cannot be used at all
    /// (missing credentials). Does not touch the network.
    fn preflight(&self, model: &str) -> Result<()>;

    async fn send(&self, prompt: &str, model: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
    OpenRouter,
    Gemini,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("gemini-") {
            Self::Gemini
        } else if model.starts_with("gpt-") {
            Self::OpenAi
        } else if model.contains('/') {
            Self::OpenRouter
        } else {
            Self::Ollama
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAi => "OpenAI",
            Self::OpenRouter => "OpenRouter",
            Self::Gemini => "Gemini",
        }
    }
}

/// Read an API key from the environment; blank values count as missing.
pub(crate) fn api_key_from_env(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|key| !key.trim().is_empty())
}

pub(crate) fn require_key<'a>(key: &'a Option<String>, provider: Provider, env_var: &str) -> Result<&'a str> {
    key.as_deref().ok_or_else(|| TransloomError::MissingCredentials {
        provider: provider.to_str().to_string(),
        env_var: env_var.to_string(),
    })
}

/// Dispatches each call to the backend that serves the requested model.
pub struct BackendRouter {
    ollama: OllamaBackend,
    openai: OpenAiBackend,
    openrouter: OpenAiBackend,
    gemini: GeminiBackend,
}

impl BackendRouter {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            ollama: OllamaBackend::new(client.clone(), &config.ollama_endpoint),
            openai: OpenAiBackend::openai(
                client.clone(),
                &config.openai_endpoint,
                &config.openai_api_key_env,
            ),
            openrouter: OpenAiBackend::openrouter(
                client.clone(),
                &config.openrouter_endpoint,
                &config.openrouter_api_key_env,
            ),
            gemini: GeminiBackend::new(client, &config.gemini_endpoint, &config.gemini_api_key_env),
        })
    }

    fn route(&self, model: &str) -> &dyn Backend {
        match Provider::for_model(model) {
            Provider::Ollama => &self.ollama,
            Provider::OpenAi => &self.openai,
            Provider::OpenRouter => &self.openrouter,
            Provider::Gemini => &self.gemini,
        }
    }

    /// Credentials check plus, for Ollama, a lookup that the model is pulled.
    pub async fn check(&self, model: &str) -> Result<()> {
        self.preflight(model)?;
        if Provider::for_model(model) == Provider::Ollama {
            self.ollama.check_model(model).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for BackendRouter {
    fn preflight(&self, model: &str) -> Result<()> {
        self.route(model).preflight(model)
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<String> {
        debug!("Routing request for {} to {}", model, Provider::for_model(model).to_str());
        self.route(model).send(prompt, model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_routing() {
        assert_eq!(Provider::for_model("gemini-2.0-flash"), Provider::Gemini);
        assert_eq!(Provider::for_model("gemini-2.0-flash-lite"), Provider::Gemini);
        assert_eq!(Provider::for_model("gpt-4o-mini"), Provider::OpenAi);
        assert_eq!(Provider::for_model("deepseek/deepseek-chat"), Provider::OpenRouter);
        assert_eq!(Provider::for_model("llama3.2:3b"), Provider::Ollama);
    }

    #[test]
    fn test_router_preflight_reports_missing_key() {
        let config = BackendConfig {
            gemini_api_key_env: "TRANSLOOM_TEST_UNSET_GEMINI_KEY".to_string(),
            ..BackendConfig::default()
        };
        let router = BackendRouter::new(&config).unwrap();

        let err = router.preflight("gemini-2.0-flash").unwrap_err();
        match err {
            TransloomError::MissingCredentials { provider, env_var } => {
                assert_eq!(provider, "Gemini");
                assert_eq!(env_var, "TRANSLOOM_TEST_UNSET_GEMINI_KEY");
            }
            other => panic!("unexpected error: {}", other),
        }

        // Ollama needs no key
        assert!(router.preflight("llama3.2:3b").is_ok());
    }
}
