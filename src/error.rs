use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransloomError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("{provider} API key is not configured (set {env_var})")]
    MissingCredentials { provider: String, env_var: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl TransloomError {
    /// Errors that mean a translation cannot start at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredentials { .. } | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, TransloomError>;
