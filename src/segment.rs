//! Document segmentation.
//!
//! Two strategies cut a document into chunks small enough for one backend
//! request:
//! - paragraph-aware splitting for free text (raw character count)
//! - length-budgeted splitting for subtitle text (effective length, where CJK
//!   ideographs weigh more because they cost the backend more tokens)

use std::sync::Arc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::SegmenterConfig;

static SENTENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern is valid")
});

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").expect("blank line pattern is valid")
});

/// Splits text into the smallest units a chunk boundary may fall between.
pub trait BoundaryDetector: Send + Sync {
    fn split_into_units(&self, text: &str) -> Vec<String>;
}

/// Sentence boundaries at runs of `.`, `!` or `?`.
///
/// Every unit keeps the whitespace that precedes it, and text after the last
/// terminator becomes a final unit, so the units concatenate back to the
/// input exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminatorBoundary;

impl BoundaryDetector for TerminatorBoundary {
    fn split_into_units(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();
        let mut last_end = 0;

        for m in SENTENCE.find_iter(text) {
            units.push(text[last_end..m.end()].to_string());
            last_end = m.end();
        }

        let tail = &text[last_end..];
        if !tail.trim().is_empty() {
            units.push(tail.to_string());
        } else if let Some(last) = units.last_mut() {
            last.push_str(tail);
        }

        units
    }
}

/// One bounded unit of a document, sent to the backend as a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub total: usize,
    pub text: String,
}

impl Chunk {
    /// Attach positional metadata to an ordered list of chunk texts.
    pub fn sequence(texts: Vec<String>) -> Vec<Chunk> {
        let total = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                is_first: index == 0,
                is_last: index + 1 == total,
                total,
                text,
            })
            .collect()
    }
}

/// A subtitle chunk and how it attaches to the chunk before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetChunk {
    pub text: String,
    /// A line break separates this chunk from the previous one in the
    /// source. Always true for the first chunk.
    pub starts_line: bool,
}

/// Collapse `\r\n` and lone `\r` to `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Length metric for the subtitle splitter: CJK Unified Ideographs count 4.
pub fn effective_length(text: &str) -> usize {
    text.chars()
        .map(|c| if ('\u{4e00}'..='\u{9fff}').contains(&c) { 4 } else { 1 })
        .sum()
}

#[derive(Clone)]
pub struct Segmenter {
    paragraph_threshold: usize,
    subtitle_budget: usize,
    boundaries: Arc<dyn BoundaryDetector>,
}

impl Segmenter {
    pub fn new(config: &SegmenterConfig) -> Self {
        Self::with_boundaries(config, Arc::new(TerminatorBoundary))
    }

    pub fn with_boundaries(config: &SegmenterConfig, boundaries: Arc<dyn BoundaryDetector>) -> Self {
        Self {
            paragraph_threshold: config.paragraph_threshold,
            subtitle_budget: config.subtitle_budget,
            boundaries,
        }
    }

    pub fn boundaries(&self) -> Arc<dyn BoundaryDetector> {
        Arc::clone(&self.boundaries)
    }

    /// Free-text split: whole paragraphs where they fit, sentences where a
    /// paragraph alone is over the threshold.
    pub fn split_paragraphs(&self, text: &str) -> Vec<String> {
        let normalized = normalize_line_endings(text);
        if normalized.trim().is_empty() {
            return Vec::new();
        }

        let max = self.paragraph_threshold;
        if normalized.chars().count() <= max {
            return vec![normalized.trim().to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in BLANK_LINE.split(&normalized).filter(|p| !p.trim().is_empty()) {
            let paragraph_len = paragraph.chars().count();

            if paragraph_len > max {
                for sentence in self.boundaries.split_into_units(paragraph) {
                    let sentence = sentence.trim();
                    if sentence.is_empty() {
                        continue;
                    }
                    let sentence_len = sentence.chars().count();

                    if !current.is_empty() && current_len + sentence_len > max {
                        push_trimmed(&mut chunks, &current);
                        current = sentence.to_string();
                        current_len = sentence_len;
                    } else {
                        if !current.is_empty() {
                            current.push(' ');
                            current_len += 1;
                        }
                        current.push_str(sentence);
                        current_len += sentence_len;
                    }
                }
            } else if !current.is_empty() && current_len + paragraph_len > max {
                push_trimmed(&mut chunks, &current);
                current = paragraph.to_string();
                current_len = paragraph_len;
            } else {
                if !current.is_empty() {
                    current.push_str("\n\n");
                    current_len += 2;
                }
                current.push_str(paragraph);
                current_len += paragraph_len;
            }
        }

        push_trimmed(&mut chunks, &current);
        debug!("Split {} characters into {} paragraph chunks", normalized.chars().count(), chunks.len());
        chunks
    }

    /// Subtitle split: sentences accumulated up to the effective-length
    /// budget. No paragraph semantics apply.
    ///
    /// A chunk boundary may fall between two sentences of the same line, so
    /// each chunk records whether it begins a new source line.
    pub fn split_by_budget(&self, text: &str) -> Vec<BudgetChunk> {
        let normalized = normalize_line_endings(text);
        if normalized.trim().is_empty() {
            return Vec::new();
        }

        let mut raw = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in self.boundaries.split_into_units(&normalized) {
            let sentence_len = effective_length(&sentence);

            // First sentence of a chunk is always taken, however long
            if current.is_empty() {
                current = sentence;
                current_len = sentence_len;
                continue;
            }

            if current_len + sentence_len > self.subtitle_budget {
                raw.push(std::mem::take(&mut current));
                current = sentence;
                current_len = sentence_len;
            } else {
                current.push_str(&sentence);
                current_len += sentence_len;
            }
        }
        raw.push(current);

        let chunks = attach_line_breaks(raw);
        debug!("Split subtitle text into {} budgeted chunks", chunks.len());
        chunks
    }
}

/// Trim raw chunks, marking those whose surrounding whitespace held a line break.
fn attach_line_breaks(raw: Vec<String>) -> Vec<BudgetChunk> {
    let mut chunks: Vec<BudgetChunk> = Vec::new();
    let mut gap = String::new();

    for text in raw {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            gap.push_str(&text);
            continue;
        }
        gap.push_str(&text[..text.len() - text.trim_start().len()]);
        chunks.push(BudgetChunk {
            text: trimmed.to_string(),
            starts_line: chunks.is_empty() || gap.contains('\n'),
        });
        gap = text[text.trim_end().len()..].to_string();
    }

    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
