use tracing::warn;

use crate::segment::Chunk;

/// Register the model is asked to write in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Neutral,
    Literary,
    Technical,
}

impl Tone {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "normal" | "neutral" | "" => Self::Neutral,
            "novel" | "literary" | "narrative" => Self::Literary,
            "academic" | "technical" => Self::Technical,
            other => {
                warn!("Unknown tone '{}', using neutral", other);
                Self::Neutral
            }
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Neutral => "normal",
            Self::Literary => "novel",
            Self::Technical => "academic",
        }
    }

    pub fn style(&self) -> &'static str {
        match self {
            Self::Neutral => {
                "Clear, direct, and neutral translation maintaining the original meaning and context"
            }
            Self::Literary => {
                "Literary style with classical Chinese novel elements, martial arts terminology, cultivation terms, and poetic expressions"
            }
            Self::Technical => {
                "Technical and specialized language with precise terminology, complex sentence structures, and detailed explanations"
            }
        }
    }
}

/// What the prompt tells the model about the target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    pub name: String,
    pub features: &'static str,
    pub style: &'static str,
}

impl LanguageProfile {
    pub fn for_code(code: &str) -> Self {
        let name = language_code_to_name(code);
        let (features, style) = match code.to_lowercase().as_str() {
            "vi" => (
                "tonal language with six tones, no verb conjugation, extensive use of particles and context-dependent meanings",
                "preference for concrete expressions, emphasis on politeness levels, and rich idiomatic expressions",
            ),
            "en" => (
                "subject-verb-object structure, verb tenses, articles, and prepositions",
                "clear and direct expression, active voice preference, and diverse vocabulary",
            ),
            _ => ("", ""),
        };
        Self { name, features, style }
    }
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English".to_string(),
        "vi" => "Vietnamese".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "zh" => "Chinese".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        "ru" => "Russian".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "pl" => "Polish".to_string(),
        "nl" => "Dutch".to_string(),
        "tr" => "Turkish".to_string(),
        "ar" => "Arabic".to_string(),
        "hi" => "Hindi".to_string(),
        "th" => "Thai".to_string(),
        "id" => "Indonesian".to_string(),
        "uk" => "Ukrainian".to_string(),
        _ => code.to_string(),
    }
}

/// Everything a free-text prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub text: &'a str,
    pub target_language: &'a str,
    pub preserve_context: bool,
    pub tone: Tone,
    pub previous_context: Option<&'a str>,
    /// `(current, total)`, 1-based; omitted for single-chunk documents and
    /// sentence-level retries
    pub position: Option<(usize, usize)>,
}

impl<'a> PromptInput<'a> {
    pub fn for_chunk(
        chunk: &'a Chunk,
        target_language: &'a str,
        preserve_context: bool,
        tone: Tone,
        previous_context: Option<&'a str>,
    ) -> Self {
        Self {
            text: &chunk.text,
            target_language,
            preserve_context,
            tone,
            previous_context: if chunk.is_first { None } else { previous_context },
            position: (chunk.total > 1).then_some((chunk.index + 1, chunk.total)),
        }
    }

    /// Same settings for a standalone piece of text, without position or context.
    pub fn piece(&self, text: &'a str) -> Self {
        Self {
            text,
            previous_context: None,
            position: None,
            ..*self
        }
    }
}

pub fn build_translation_prompt(input: &PromptInput<'_>) -> String {
    let language = LanguageProfile::for_code(input.target_language);

    let context_rules = if input.preserve_context {
        "- Preserve the original context, style, tone, and cultural elements\n\
         - Maintain the author's voice and intended message\n\
         - Keep any specialized terminology or jargon in their appropriate context"
    } else {
        "- Focus on clarity and accuracy of meaning"
    };

    let mut prompt = format!(
        "You are an expert translator with native-level proficiency in both the source language and {name}.\n\
         Your task is to provide a high-quality translation that sounds natural and authentic to native {name} speakers.\n\
         \n\
         TRANSLATION STYLE:\n\
         {style}\n\
         \n\
         TRANSLATION CONTEXT:\n\
         {context_rules}\n",
        name = language.name,
        style = input.tone.style(),
        context_rules = context_rules,
    );

    if let Some(previous) = input.previous_context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!(
            "\nPrevious context for reference (use this to maintain consistency):\n{}\n",
            previous
        ));
    }

    if let Some((current, total)) = input.position {
        prompt.push_str(&format!("\nThis is part {}/{} of the text.\n", current, total));
    }

    prompt.push_str(&format!(
        "\nTRANSLATION REQUIREMENTS:\n\
         1. PRODUCE ONLY THE TRANSLATED TEXT - NO EXPLANATIONS OR NOTES\n\
         2. PRESERVE ALL FORMATTING INCLUDING:\n\
         \x20  - Paragraph breaks\n\
         \x20  - Line spacing\n\
         \x20  - Special characters\n\
         \x20  - Text emphasis (bold, italic, etc.)\n\
         3. MAINTAIN AUTHENTICITY:\n\
         \x20  - Use natural {name} expressions and idioms\n\
         \x20  - Adapt cultural references appropriately\n",
        name = language.name,
    ));
    if !language.features.is_empty() {
        prompt.push_str(&format!("   - Consider {}\n", language.features));
    }
    if !language.style.is_empty() {
        prompt.push_str(&format!("   - Follow {}\n", language.style));
    }
    prompt.push_str(
        "4. ENSURE CONSISTENCY:\n\
         \x20  - Maintain consistent terminology throughout\n\
         \x20  - Use consistent tone and style\n\
         \x20  - Keep proper nouns and technical terms consistent with the previous context\n\
         5. GRAMMAR AND STRUCTURE:\n\
         \x20  - Use correct grammar and punctuation\n\
         \x20  - Maintain logical flow between sentences\n\
         6. CONTEXT AND MEANING:\n\
         \x20  - Preserve the original meaning precisely\n\
         \x20  - Maintain the emotional impact and tone\n\
         \x20  - Keep any humor or wordplay (adapt if necessary)\n\
         7. QUALITY CHECKS:\n\
         \x20  - Ensure no omissions or additions\n\
         \x20  - Check for natural flow and readability\n",
    );

    prompt.push_str(&format!("\nCONTENT TO TRANSLATE:\n{}", input.text));
    prompt
}

/// Prompt for a block of subtitle lines: one translated line per source line.
pub fn build_subtitle_prompt(
    text: &str,
    target_language: &str,
    previous_context: Option<&str>,
    position: (usize, usize),
) -> String {
    let language_name = language_code_to_name(target_language);
    let (current, total) = position;

    let mut prompt = format!(
        "Translate the following subtitle lines to {}. This is part {}/{}. \
         Return only the translated lines, one per line:\n\n{}\n\n\
         Requirements:\n\
         - Return only the translated lines\n\
         - Keep exactly one output line per input line\n\
         - Do not add numbering\n\
         - Do not add any notes or comments\n\
         - Do not add bullet points\n",
        language_name, current, total, text
    );

    if let Some(previous) = previous_context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!(
            "\n[Previous lines for reference - DO NOT translate this part]\n{}\n",
            previous
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_aliases() {
        assert_eq!(Tone::from_str("normal"), Tone::Neutral);
        assert_eq!(Tone::from_str("Novel"), Tone::Literary);
        assert_eq!(Tone::from_str("narrative"), Tone::Literary);
        assert_eq!(Tone::from_str("academic"), Tone::Technical);
        assert_eq!(Tone::from_str("shouty"), Tone::Neutral);
        for tone in [Tone::Neutral, Tone::Literary, Tone::Technical] {
            assert_eq!(Tone::from_str(tone.to_str()), tone);
        }
    }

    #[test]
    fn test_tones_change_style_section() {
        let base = PromptInput {
            text: "Hello.",
            target_language: "vi",
            preserve_context: true,
            tone: Tone::Neutral,
            previous_context: None,
            position: None,
        };
        let neutral = build_translation_prompt(&base);
        let technical = build_translation_prompt(&PromptInput { tone: Tone::Technical, ..base });

        assert!(neutral.contains(Tone::Neutral.style()));
        assert!(technical.contains(Tone::Technical.style()));
        assert_ne!(neutral, technical);
    }

    #[test]
    fn test_prompt_mentions_language_and_content() {
        let prompt = build_translation_prompt(&PromptInput {
            text: "The quick brown fox.",
            target_language: "vi",
            preserve_context: false,
            tone: Tone::Neutral,
            previous_context: None,
            position: None,
        });
        assert!(prompt.contains("Vietnamese"));
        assert!(prompt.contains("six tones"));
        assert!(prompt.contains("Focus on clarity"));
        assert!(prompt.ends_with("CONTENT TO TRANSLATE:\nThe quick brown fox."));
        assert!(!prompt.contains("Previous context"));
        assert!(!prompt.contains("This is part"));
    }

    #[test]
    fn test_chunk_prompt_carries_context_after_first() {
        let chunks = Chunk::sequence(vec!["One.".into(), "Two.".into()]);

        let first = PromptInput::for_chunk(&chunks[0], "en", true, Tone::Neutral, Some("ignored"));
        assert_eq!(first.previous_context, None);
        assert_eq!(first.position, Some((1, 2)));

        let second = PromptInput::for_chunk(&chunks[1], "en", true, Tone::Neutral, Some("tail of one"));
        let prompt = build_translation_prompt(&second);
        assert!(prompt.contains("Previous context for reference"));
        assert!(prompt.contains("tail of one"));
        assert!(prompt.contains("This is part 2/2 of the text."));

        let piece = second.piece("Two.");
        assert_eq!(piece.previous_context, None);
        assert_eq!(piece.position, None);
    }

    #[test]
    fn test_unknown_language_falls_back_to_code() {
        let profile = LanguageProfile::for_code("xx");
        assert_eq!(profile.name, "xx");
        assert!(profile.features.is_empty());
    }

    #[test]
    fn test_subtitle_prompt() {
        let prompt = build_subtitle_prompt("Hi.\nBye.", "ja", None, (1, 3));
        assert!(prompt.contains("Japanese"));
        assert!(prompt.contains("part 1/3"));
        assert!(prompt.contains("Hi.\nBye."));
        assert!(!prompt.contains("Previous lines"));

        let with_context = build_subtitle_prompt("Next.", "ja", Some("前の行"), (2, 3));
        assert!(with_context.contains("前の行"));
    }
}
