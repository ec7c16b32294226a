//! Post-processing of translated text.
//!
//! A post-processor rewrites each translated unit before it is stitched into
//! the document. Errors never fail a translation: [`apply_or_passthrough`]
//! turns them into a warning and returns the text unchanged.

use std::collections::HashMap;
use std::path::Path;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TransloomError};

#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn apply(&self, text: &str) -> Result<String>;
}

/// Identity post-processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl PostProcessor for PassThrough {
    async fn apply(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TermFile {
    #[serde(default)]
    terms: HashMap<String, String>,
}

/// Term substitution table, e.g. fixed renderings of character names.
///
/// Longer terms are replaced first so that a term containing another term
/// wins over it.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    terms: Vec<(String, String)>,
}

impl TermDictionary {
    pub fn new<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut terms: Vec<(String, String)> = terms
            .into_iter()
            .filter(|(source, _)| !source.is_empty())
            .collect();
        terms.sort_by(|a, b| {
            b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(&b.0))
        });
        Self { terms }
    }

    /// Load a `[terms]` table from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TransloomError::Config(format!("Failed to read dictionary {}: {}", path.display(), e)))?;
        let file: TermFile = toml::from_str(&content)
            .map_err(|e| TransloomError::Config(format!("Failed to parse dictionary {}: {}", path.display(), e)))?;

        debug!("Loaded {} dictionary terms from {}", file.terms.len(), path.display());
        Ok(Self::new(file.terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn substitute(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (source, target) in &self.terms {
            if result.contains(source.as_str()) {
                result = result.replace(source.as_str(), target);
            }
        }
        result
    }
}

#[async_trait]
impl PostProcessor for TermDictionary {
    async fn apply(&self, text: &str) -> Result<String> {
        Ok(self.substitute(text))
    }
}

/// Run a post-processor, falling back to the unmodified text on error.
pub async fn apply_or_passthrough(processor: &dyn PostProcessor, text: &str) -> String {
    match processor.apply(text).await {
        Ok(processed) => processed,
        Err(e) => {
            warn!("Post-processing failed, keeping text unchanged: {}", e);
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl PostProcessor for Broken {
        async fn apply(&self, _text: &str) -> Result<String> {
            Err(TransloomError::Backend("dictionary service unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_longest_term_wins() {
        let dict = TermDictionary::new(vec![
            ("Lâm".to_string(), "Lin".to_string()),
            ("Lâm Động".to_string(), "Lin Dong".to_string()),
        ]);
        let out = dict.apply("Lâm Động gặp Lâm.").await.unwrap();
        assert_eq!(out, "Lin Dong gặp Lin.");
    }

    #[tokio::test]
    async fn test_no_match_is_identity() {
        let dict = TermDictionary::new(vec![("foo".to_string(), "bar".to_string())]);
        let text = "nothing to replace here";
        assert_eq!(dict.apply(text).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_failure_passes_text_through() {
        assert_eq!(apply_or_passthrough(&Broken, "keep me").await, "keep me");
        assert_eq!(apply_or_passthrough(&PassThrough, "same").await, "same");
    }

    #[test]
    fn test_load_from_toml() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("terms.toml");
        std::fs::write(&path, "[terms]\n\"Tiêu Viêm\" = \"Xiao Yan\"\n\"Dược Lão\" = \"Yao Lao\"\n").unwrap();

        let dict = TermDictionary::from_file(&path).unwrap();
        assert_eq!(dict.len(), 2);
        let out = tokio_test::block_on(dict.apply("Tiêu Viêm và Dược Lão"));
        assert_eq!(out.unwrap(), "Xiao Yan và Yao Lao");
    }

    #[test]
    fn test_missing_dictionary_is_config_error() {
        let err = TermDictionary::from_file("/nonexistent/terms.toml").unwrap_err();
        assert!(err.is_fatal());
    }
}
