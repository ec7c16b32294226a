//! Transloom - chunked, context-preserving translation
//!
//! Splits long text and subtitle transcripts into bounded chunks, translates
//! each chunk through a language-model backend while carrying the tail of the
//! previous chunk forward as context, and stitches the result back together.

pub mod backend;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod orchestrator;
pub mod segment;
pub mod subtitle;
pub mod translate;
pub mod workflow;

pub use error::{Result, TransloomError};
pub use orchestrator::{SubtitleOptions, TranslateOptions, TranslationOrchestrator, TranslationReport};
