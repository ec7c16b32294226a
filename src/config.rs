use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, TransloomError};

// Default values used when a section or field is missing from config.toml
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openrouter_endpoint() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_paragraph_threshold() -> usize {
    3000
}

fn default_subtitle_budget() -> usize {
    5000
}

fn default_target_language() -> String {
    "vi".to_string()
}

fn default_tone() -> String {
    "normal".to_string()
}

fn default_true() -> bool {
    true
}

fn default_context_chars() -> usize {
    200
}

fn default_max_parallel_documents() -> usize {
    2
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string(), "md".to_string(), "srt".to_string()]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub dictionary: DictionaryConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Model used when the caller does not pick one
    #[serde(default = "default_model")]
    pub model: String,
    /// HTTP timeout for a single backend call (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ollama endpoint URL
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,
    /// OpenAI API base URL
    #[serde(default = "default_openai_endpoint")]
    pub openai_endpoint: String,
    /// OpenRouter API base URL
    #[serde(default = "default_openrouter_endpoint")]
    pub openrouter_endpoint: String,
    /// Gemini API base URL
    #[serde(default = "default_gemini_endpoint")]
    pub gemini_endpoint: String,
    /// Environment variable holding the OpenAI key
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,
    /// Environment variable holding the OpenRouter key
    #[serde(default = "default_openrouter_key_env")]
    pub openrouter_api_key_env: String,
    /// Environment variable holding the Gemini key
    #[serde(default = "default_gemini_key_env")]
    pub gemini_api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Character ceiling for free-text chunks
    #[serde(default = "default_paragraph_threshold")]
    pub paragraph_threshold: usize,
    /// Effective-length ceiling for subtitle chunks (CJK ideographs weigh 4)
    #[serde(default = "default_subtitle_budget")]
    pub subtitle_budget: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Default target language code
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Default tone profile: normal, novel or academic
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Ask the model to keep the author's voice and terminology
    #[serde(default = "default_true")]
    pub preserve_context: bool,
    /// Length of the trailing excerpt carried between chunks (characters)
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// TOML term table applied to every translated chunk
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Documents translated concurrently in batch mode
    #[serde(default = "default_max_parallel_documents")]
    pub max_parallel_documents: usize,
    /// File extensions picked up in batch mode
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            ollama_endpoint: default_ollama_endpoint(),
            openai_endpoint: default_openai_endpoint(),
            openrouter_endpoint: default_openrouter_endpoint(),
            gemini_endpoint: default_gemini_endpoint(),
            openai_api_key_env: default_openai_key_env(),
            openrouter_api_key_env: default_openrouter_key_env(),
            gemini_api_key_env: default_gemini_key_env(),
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            paragraph_threshold: default_paragraph_threshold(),
            subtitle_budget: default_subtitle_budget(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            tone: default_tone(),
            preserve_context: true,
            context_chars: default_context_chars(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_parallel_documents: default_max_parallel_documents(),
            extensions: default_extensions(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TransloomError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TransloomError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TransloomError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TransloomError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            "[backend]\nmodel = \"llama3.2:3b\"\n\n[segmenter]\nsubtitle_budget = 800\n",
        )
        .unwrap();

        assert_eq!(config.backend.model, "llama3.2:3b");
        assert_eq!(config.backend.ollama_endpoint, "http://localhost:11434");
        assert_eq!(config.segmenter.subtitle_budget, 800);
        assert_eq!(config.segmenter.paragraph_threshold, 3000);
        assert_eq!(config.translate.context_chars, 200);
        assert!(config.translate.preserve_context);
        assert!(config.dictionary.path.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.translate.target_language = "ja".to_string();
        config.workflow.max_parallel_documents = 4;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.translate.target_language, "ja");
        assert_eq!(reloaded.workflow.max_parallel_documents, 4);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/transloom.toml").unwrap_err();
        assert!(err.is_fatal());
    }
}
