use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::error::Result;
use crate::segment::normalize_line_endings;

/// One block of an SRT transcript.
///
/// The timecode is carried through untouched; only position in the
/// transcript decides ordering, never `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub id: i64,
    pub timecode: String,
    pub text: String,
}

/// Parse an SRT transcript into entries.
///
/// Blocks with fewer than three non-empty lines, or whose first line is not
/// an integer, are skipped with a warning.
pub fn parse(transcript: &str) -> Vec<SubtitleEntry> {
    let normalized = normalize_line_endings(transcript);

    normalized
        .trim()
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .filter_map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> Option<SubtitleEntry> {
    let lines: Vec<&str> = block.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 3 {
        warn!("Invalid SRT block: {:?}", block);
        return None;
    }

    let id = match lines[0].trim().parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            warn!("Invalid SRT ID: {:?}", lines[0]);
            return None;
        }
    };

    Some(SubtitleEntry {
        id,
        timecode: lines[1].to_string(),
        text: lines[2..].iter().map(|line| line.trim()).collect::<Vec<_>>().join(" "),
    })
}

/// Render entries back to SRT: blank-line separated blocks, one trailing newline.
pub fn format(entries: &[SubtitleEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let blocks: Vec<String> = entries
        .iter()
        .map(|entry| format!("{}\n{}\n{}", entry.id, entry.timecode, entry.text))
        .collect();

    let mut srt_content = blocks.join("\n\n");
    srt_content.push('\n');
    srt_content
}

/// Pair translated lines with entries by position.
///
/// A short translation is padded with each remaining entry's own original
/// text; surplus lines are dropped.
pub fn realign(entries: &[SubtitleEntry], translated: &str) -> Vec<SubtitleEntry> {
    let mut lines: Vec<String> = translated.lines().map(str::to_string).collect();

    if lines.len() != entries.len() {
        warn!(
            "Translation mismatch: expected {} entries but got {} translations",
            entries.len(),
            lines.len()
        );
        if lines.len() < entries.len() {
            let missing = entries[lines.len()..].iter().map(|entry| entry.text.clone());
            lines.extend(missing);
        } else {
            lines.truncate(entries.len());
        }
    }

    entries
        .iter()
        .zip(lines)
        .map(|(entry, text)| SubtitleEntry {
            text: if text.trim().is_empty() { entry.text.clone() } else { text },
            ..entry.clone()
        })
        .collect()
}

/// Read and parse an SRT file.
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    Ok(parse(&content))
}

/// Write entries to an SRT file.
pub async fn write_srt<P: AsRef<Path>>(entries: &[SubtitleEntry], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, format(entries)).await?;

    info!("SRT file generated successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, timecode: &str, text: &str) -> SubtitleEntry {
        SubtitleEntry { id, timecode: timecode.to_string(), text: text.to_string() }
    }

    fn sample() -> Vec<SubtitleEntry> {
        vec![
            entry(1, "00:00:01,000 --> 00:00:02,500", "Hello there."),
            entry(2, "00:00:03,000 --> 00:00:04,000", "How are you?"),
            entry(7, "00:00:05,000 --> 00:00:06,000", "Fine, thanks."),
        ]
    }

    #[test]
    fn test_parse_joins_multiline_text() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\nFirst line\r\nsecond line\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nNext\r\n";
        let entries = parse(srt);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "First line second line");
        assert_eq!(entries[1].id, 2);
        assert_eq!(entries[1].timecode, "00:00:03,000 --> 00:00:04,000");
    }

    #[test]
    fn test_parse_skips_malformed_blocks() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nKept\n\n2\n00:00:03,000 --> 00:00:04,000\n\nx\n00:00:05,000 --> 00:00:06,000\nBad id\n\n4\n00:00:07,000 --> 00:00:08,000\nAlso kept\n";
        let entries = parse(srt);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Kept");
        assert_eq!(entries[1].id, 4);
    }

    #[test]
    fn test_parse_empty_transcript() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }

    #[test]
    fn test_format_exact_layout() {
        let out = format(&sample()[..2]);
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n2\n00:00:03,000 --> 00:00:04,000\nHow are you?\n"
        );
        assert_eq!(format(&[]), "");
    }

    #[test]
    fn test_format_then_parse_round_trip() {
        let entries = sample();
        assert_eq!(parse(&format(&entries)), entries);
    }

    #[test]
    fn test_realign_pads_with_original_text() {
        let entries = sample();
        let aligned = realign(&entries, "Xin chào.\nBạn khỏe không?");
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].text, "Xin chào.");
        assert_eq!(aligned[1].text, "Bạn khỏe không?");
        assert_eq!(aligned[2].text, "Fine, thanks.");
        assert_eq!(aligned[2].id, 7);
    }

    #[test]
    fn test_realign_drops_surplus_lines() {
        let entries = sample();
        let aligned = realign(&entries, "a\nb\nc\nd\ne");
        let texts: Vec<_> = aligned.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_realign_keeps_timecodes_verbatim() {
        let entries = vec![entry(3, "weird timecode", "one")];
        let aligned = realign(&entries, "uno");
        assert_eq!(aligned[0].timecode, "weird timecode");
        assert_eq!(aligned[0].id, 3);
    }

    #[tokio::test]
    async fn test_srt_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");

        write_srt(&sample(), &path).await.unwrap();
        let entries = read_srt(&path).await.unwrap();
        assert_eq!(entries, sample());
    }
}
