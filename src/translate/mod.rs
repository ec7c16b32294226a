// Chunk translation
//
// - prompt: tone and language profiles, free-text and subtitle prompt templates
// - chunk: one chunk through the backend, with sentence-level fallback

pub mod chunk;
pub mod prompt;

pub use chunk::{ChunkJob, ChunkOutcome, ChunkTranslator, JobKind, PieceOutcome};
pub use prompt::{language_code_to_name, LanguageProfile, Tone};
