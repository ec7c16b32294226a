use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{Result, TransloomError};
use crate::segment::{BoundaryDetector, Chunk};
use super::prompt::{build_subtitle_prompt, build_translation_prompt, PromptInput, Tone};

/// How a chunk is phrased to the model and how its reply is cleaned.
#[derive(Debug, Clone, Copy)]
pub enum JobKind<'a> {
    Prose {
        target_language: &'a str,
        preserve_context: bool,
        tone: Tone,
    },
    Subtitle {
        target_language: &'a str,
    },
}

/// One chunk translation request.
#[derive(Debug, Clone, Copy)]
pub struct ChunkJob<'a> {
    pub chunk: &'a Chunk,
    pub model: &'a str,
    pub kind: JobKind<'a>,
    pub previous_context: Option<&'a str>,
}

/// Result of a single sentence-level retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceOutcome {
    Translated { lead: String, text: String },
    /// The backend failed for this piece too; the source text is kept.
    Verbatim { lead: String, text: String },
}

/// Result of one chunk: either the whole chunk came back, or it was retried
/// piece by piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Translated(String),
    FallbackToSentences(Vec<PieceOutcome>),
}

impl ChunkOutcome {
    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated(_))
    }

    /// Pieces that had to be kept in the source language.
    pub fn verbatim_pieces(&self) -> usize {
        match self {
            Self::Translated(_) => 0,
            Self::FallbackToSentences(pieces) => pieces
                .iter()
                .filter(|piece| matches!(piece, PieceOutcome::Verbatim { .. }))
                .count(),
        }
    }

    /// Stitch the outcome back into text, each piece after its leading whitespace.
    pub fn into_text(self) -> String {
        match self {
            Self::Translated(text) => text,
            Self::FallbackToSentences(pieces) => {
                let mut out = String::new();
                for piece in pieces {
                    let (PieceOutcome::Translated { lead, text } | PieceOutcome::Verbatim { lead, text }) = piece;
                    out.push_str(&lead);
                    out.push_str(&text);
                }
                out.trim().to_string()
            }
        }
    }
}

/// Drives one chunk through the backend.
///
/// Never returns an error: a failed chunk is retried sentence by sentence,
/// and a failed sentence is kept untranslated.
pub struct ChunkTranslator {
    backend: Arc<dyn Backend>,
    boundaries: Arc<dyn BoundaryDetector>,
}

impl ChunkTranslator {
    pub fn new(backend: Arc<dyn Backend>, boundaries: Arc<dyn BoundaryDetector>) -> Self {
        Self { backend, boundaries }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn chunk_prompt(&self, job: &ChunkJob<'_>) -> String {
        match job.kind {
            JobKind::Prose { target_language, preserve_context, tone } => {
                build_translation_prompt(&PromptInput::for_chunk(
                    job.chunk,
                    target_language,
                    preserve_context,
                    tone,
                    job.previous_context,
                ))
            }
            JobKind::Subtitle { target_language } => build_subtitle_prompt(
                &job.chunk.text,
                target_language,
                if job.chunk.is_first { None } else { job.previous_context },
                (job.chunk.index + 1, job.chunk.total),
            ),
        }
    }

    fn piece_prompt(&self, job: &ChunkJob<'_>, text: &str) -> String {
        match job.kind {
            JobKind::Prose { target_language, preserve_context, tone } => {
                let chunk_input = PromptInput::for_chunk(
                    job.chunk,
                    target_language,
                    preserve_context,
                    tone,
                    None,
                );
                build_translation_prompt(&chunk_input.piece(text))
            }
            JobKind::Subtitle { target_language } => {
                build_subtitle_prompt(text, target_language, None, (1, 1))
            }
        }
    }

    async fn request(&self, job: &ChunkJob<'_>, prompt: &str) -> Result<String> {
        let raw = self.backend.send(prompt, job.model).await?;
        let cleaned = match job.kind {
            JobKind::Prose { .. } => raw.trim().to_string(),
            JobKind::Subtitle { .. } => clean_subtitle_response(&raw),
        };
        if cleaned.is_empty() {
            return Err(TransloomError::EmptyResponse(job.model.to_string()));
        }
        Ok(cleaned)
    }

    pub async fn translate(&self, job: &ChunkJob<'_>) -> ChunkOutcome {
        let prompt = self.chunk_prompt(job);

        match self.request(job, &prompt).await {
            Ok(text) => {
                info!("✓ Completed chunk {}/{}", job.chunk.index + 1, job.chunk.total);
                ChunkOutcome::Translated(text)
            }
            Err(e) => {
                warn!(
                    "Error translating chunk {}/{}: {} - retrying sentence by sentence",
                    job.chunk.index + 1,
                    job.chunk.total,
                    e
                );
                ChunkOutcome::FallbackToSentences(self.translate_pieces(job).await)
            }
        }
    }

    async fn translate_pieces(&self, job: &ChunkJob<'_>) -> Vec<PieceOutcome> {
        let mut pieces = Vec::new();

        for unit in self.boundaries.split_into_units(&job.chunk.text) {
            let body = unit.trim();
            if body.is_empty() {
                continue;
            }
            let lead = unit[..unit.len() - unit.trim_start().len()].to_string();

            let prompt = self.piece_prompt(job, body);
            match self.request(job, &prompt).await {
                Ok(text) => pieces.push(PieceOutcome::Translated { lead, text }),
                Err(e) => {
                    warn!("│ Sentence translation failed, keeping original: {}", e);
                    pieces.push(PieceOutcome::Verbatim { lead, text: body.to_string() });
                }
            }
        }

        pieces
    }
}

/// Trim reply lines and drop blank lines, bullets and bracketed notes.
pub fn clean_subtitle_response(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('-') && !line.starts_with('['))
        .collect::<Vec<_>>()
        .join("\n")
}
