use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{Backend, BackendRouter};
use crate::config::Config;
use crate::dictionary::{apply_or_passthrough, PassThrough, PostProcessor, TermDictionary};
use crate::error::Result;
use crate::segment::{BudgetChunk, Chunk, Segmenter};
use crate::subtitle::{self, SubtitleEntry};
use crate::translate::{ChunkJob, ChunkOutcome, ChunkTranslator, JobKind, PieceOutcome, Tone};

/// Progress callback: `(current, total)`, 1-based, reported before each chunk.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub model: String,
    pub target_language: String,
    pub preserve_context: bool,
    pub tone: Tone,
}

impl TranslateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.backend.model.clone(),
            target_language: config.translate.target_language.clone(),
            preserve_context: config.translate.preserve_context,
            tone: Tone::from_str(&config.translate.tone),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubtitleOptions {
    pub model: String,
    pub target_language: String,
}

impl SubtitleOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.backend.model.clone(),
            target_language: config.translate.target_language.clone(),
        }
    }
}

impl From<&TranslateOptions> for SubtitleOptions {
    fn from(options: &TranslateOptions) -> Self {
        Self {
            model: options.model.clone(),
            target_language: options.target_language.clone(),
        }
    }
}

/// Summary of one document translation.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationReport {
    pub run_id: Uuid,
    pub chunks: usize,
    /// Chunks that needed the sentence-level fallback
    pub degraded_chunks: usize,
    /// Sentences left in the source language
    pub verbatim_pieces: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TranslationReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            chunks: 0,
            degraded_chunks: 0,
            verbatim_pieces: 0,
            started_at: now,
            finished_at: now,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn is_complete(&self) -> bool {
        self.verbatim_pieces == 0
    }
}

/// Runs one document through segmentation, chunk translation and assembly.
///
/// Chunks of a document run strictly in order, since each prompt carries the
/// tail of the previous chunk's output. Separate documents share nothing
/// mutable and can run concurrently on the same orchestrator.
pub struct TranslationOrchestrator {
    segmenter: Segmenter,
    translator: ChunkTranslator,
    post: Arc<dyn PostProcessor>,
    context_chars: usize,
}

impl TranslationOrchestrator {
    pub fn new(
        segmenter: Segmenter,
        backend: Arc<dyn Backend>,
        post: Arc<dyn PostProcessor>,
        context_chars: usize,
    ) -> Self {
        let translator = ChunkTranslator::new(backend, segmenter.boundaries());
        Self {
            segmenter,
            translator,
            post,
            context_chars,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn Backend> = Arc::new(BackendRouter::new(&config.backend)?);
        let post: Arc<dyn PostProcessor> = match &config.dictionary.path {
            Some(path) => Arc::new(TermDictionary::from_file(path)?),
            None => Arc::new(PassThrough),
        };

        Ok(Self::new(
            Segmenter::new(&config.segmenter),
            backend,
            post,
            config.translate.context_chars,
        ))
    }

    pub async fn translate(
        &self,
        text: &str,
        options: &TranslateOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<String> {
        self.translate_with_report(text, options, on_progress)
            .await
            .map(|(text, _)| text)
    }

    pub async fn translate_with_report(
        &self,
        text: &str,
        options: &TranslateOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<(String, TranslationReport)> {
        let mut report = TranslationReport::start();

        if text.trim().is_empty() {
            return Ok((String::new(), report.finish()));
        }

        self.translator.backend().preflight(&options.model)?;

        let chunks = Chunk::sequence(self.segmenter.split_paragraphs(text));
        let kind = JobKind::Prose {
            target_language: &options.target_language,
            preserve_context: options.preserve_context,
            tone: options.tone,
        };

        let span = info_span!(
            "translate",
            run_id = %report.run_id,
            model = %options.model,
            tone = options.tone.to_str()
        );
        let translated = self
            .run_chunks(&chunks, &options.model, kind, on_progress, &mut report)
            .instrument(span)
            .await;

        Ok((translated.join("\n\n"), report.finish()))
    }

    pub async fn translate_subtitles(
        &self,
        transcript: &str,
        options: &SubtitleOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<String> {
        self.translate_subtitles_with_report(transcript, options, on_progress)
            .await
            .map(|(text, _)| text)
    }

    pub async fn translate_subtitles_with_report(
        &self,
        transcript: &str,
        options: &SubtitleOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<(String, TranslationReport)> {
        if transcript.trim().is_empty() {
            return Ok((String::new(), TranslationReport::start().finish()));
        }

        let entries = subtitle::parse(transcript);
        let (translated, report) = self
            .translate_entries_with_report(&entries, options, on_progress)
            .await?;
        Ok((subtitle::format(&translated), report))
    }

    /// Translate parsed subtitle entries, one output entry per input entry.
    pub async fn translate_entries_with_report(
        &self,
        entries: &[SubtitleEntry],
        options: &SubtitleOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<(Vec<SubtitleEntry>, TranslationReport)> {
        let mut report = TranslationReport::start();

        if entries.is_empty() {
            warn!("No valid SRT entries found");
            return Ok((Vec::new(), report.finish()));
        }

        self.translator.backend().preflight(&options.model)?;

        let all_text = entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let budgeted = self.segmenter.split_by_budget(&all_text);
        let line_starts: Vec<bool> = budgeted.iter().map(|chunk| chunk.starts_line).collect();
        let chunks = Chunk::sequence(budgeted.into_iter().map(|chunk: BudgetChunk| chunk.text).collect());
        let kind = JobKind::Subtitle {
            target_language: &options.target_language,
        };

        let span = info_span!("subtitles", run_id = %report.run_id, model = %options.model);
        let translated = self
            .run_chunks(&chunks, &options.model, kind, on_progress, &mut report)
            .instrument(span)
            .await;

        let aligned = subtitle::realign(entries, &join_subtitle_chunks(&translated, &line_starts));
        Ok((aligned, report.finish()))
    }

    async fn run_chunks(
        &self,
        chunks: &[Chunk],
        model: &str,
        kind: JobKind<'_>,
        on_progress: Option<ProgressFn<'_>>,
        report: &mut TranslationReport,
    ) -> Vec<String> {
        let mut translated_chunks = Vec::with_capacity(chunks.len());
        let mut previous_context = String::new();

        for chunk in chunks {
            if let Some(progress) = on_progress {
                progress(chunk.index + 1, chunk.total);
            }
            info!("┌─ Translating chunk {}/{} ────────", chunk.index + 1, chunk.total);

            let job = ChunkJob {
                chunk,
                model,
                kind,
                previous_context: (!previous_context.is_empty()).then_some(previous_context.as_str()),
            };
            let outcome = self.translator.translate(&job).await;

            report.chunks += 1;
            report.verbatim_pieces += outcome.verbatim_pieces();
            let translated = outcome.is_translated();
            if !translated {
                report.degraded_chunks += 1;
            }

            let processed = self.post_process(outcome).await;
            if translated {
                previous_context = trailing_excerpt(&processed, self.context_chars);
            }
            info!("└─ chunk {}/{} {}", chunk.index + 1, chunk.total, if translated { "done" } else { "degraded" });

            translated_chunks.push(processed);
        }

        translated_chunks
    }

    /// Apply the post-processor to every translated part of an outcome.
    /// Text kept verbatim after a failure is left alone.
    async fn post_process(&self, outcome: ChunkOutcome) -> String {
        let processed = match outcome {
            ChunkOutcome::Translated(text) => {
                ChunkOutcome::Translated(apply_or_passthrough(self.post.as_ref(), &text).await)
            }
            ChunkOutcome::FallbackToSentences(pieces) => {
                let mut processed = Vec::with_capacity(pieces.len());
                for piece in pieces {
                    processed.push(match piece {
                        PieceOutcome::Translated { lead, text } => PieceOutcome::Translated {
                            lead,
                            text: apply_or_passthrough(self.post.as_ref(), &text).await,
                        },
                        verbatim @ PieceOutcome::Verbatim { .. } => verbatim,
                    });
                }
                ChunkOutcome::FallbackToSentences(processed)
            }
        };
        processed.into_text()
    }
}

/// Join translated subtitle chunks, breaking lines only where the source did.
fn join_subtitle_chunks(translated: &[String], line_starts: &[bool]) -> String {
    let mut joined = String::new();
    for (index, (text, starts_line)) in translated.iter().zip(line_starts).enumerate() {
        if index > 0 {
            joined.push(if *starts_line { '\n' } else { ' ' });
        }
        joined.push_str(text);
    }
    joined
}

/// Last `max_chars` characters of `text`.
pub fn trailing_excerpt(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}
