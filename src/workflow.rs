use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, TransloomError};
use crate::subtitle;
use crate::orchestrator::{
    ProgressFn, SubtitleOptions, TranslateOptions, TranslationOrchestrator, TranslationReport,
};

/// How a file is translated, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Subtitle,
}

impl DocumentKind {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("srt") => Self::Subtitle,
            _ => Self::PlainText,
        }
    }
}

/// Output name for a translated file: `<stem>_<lang>.<ext>` next to the input.
pub fn output_file_name<P: AsRef<Path>>(input: P, target_language: &str) -> Result<String> {
    let input = input.as_ref();
    let stem = input.file_stem()
        .ok_or_else(|| TransloomError::Config(format!("Invalid filename: {}", input.display())))?
        .to_string_lossy();

    Ok(match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, target_language, ext.to_string_lossy()),
        None => format!("{}_{}", stem, target_language),
    })
}

pub struct Workflow {
    config: Config,
    orchestrator: Arc<TranslationOrchestrator>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let orchestrator = Arc::new(TranslationOrchestrator::from_config(&config)?);
        Ok(Self { config, orchestrator })
    }

    pub fn with_orchestrator(config: Config, orchestrator: TranslationOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Translate a single file, picking subtitle mode for `.srt`.
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        options: &TranslateOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TranslationReport> {
        let input_path = input_path.as_ref();
        if !self.is_supported(input_path) {
            return Err(TransloomError::UnsupportedFormat(input_path.display().to_string()));
        }
        translate_one(
            &self.orchestrator,
            input_path,
            output_path.as_ref(),
            options,
            on_progress,
        )
        .await
    }

    /// Translate every matching file under a directory.
    ///
    /// Documents run concurrently up to `workflow.max_parallel_documents`;
    /// a failed document is logged and the rest carry on. Returns the number
    /// of files written.
    pub async fn translate_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Option<Q>,
        options: &TranslateOptions,
    ) -> Result<usize> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(TransloomError::Config("Input path is not a directory".to_string()));
        }

        // Determine output directory
        let output_dir = match output_dir {
            Some(dir) => dir.as_ref().to_path_buf(),
            None => input_dir.to_path_buf(),
        };
        fs::create_dir_all(&output_dir).await?;

        let files = self.find_documents(input_dir, &output_dir, &options.target_language);
        info!("Found {} files to translate", files.len());

        let permits = Arc::new(Semaphore::new(self.config.workflow.max_parallel_documents.max(1)));
        let mut tasks = JoinSet::new();

        for (input, output) in files {
            let orchestrator = Arc::clone(&self.orchestrator);
            let permits = Arc::clone(&permits);
            let options = options.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result: Result<TranslationReport> = async {
                    if let Some(parent) = output.parent() {
                        fs::create_dir_all(parent).await?;
                    }
                    translate_one(&orchestrator, &input, &output, &options, None).await
                }
                .await;
                match result {
                    Ok(report) => Ok((input, report)),
                    Err(e) => {
                        warn!("Failed to translate {}: {}", input.display(), e);
                        Err(e)
                    }
                }
            });
        }

        let mut written = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((input, report))) => {
                    written += 1;
                    info!(
                        "Successfully translated: {} ({} chunks, {} degraded)",
                        input.display(),
                        report.chunks,
                        report.degraded_chunks
                    );
                }
                Ok(Err(e)) if e.is_fatal() => return Err(e),
                Ok(Err(_)) => {}
                Err(e) => warn!("Translation task panicked: {}", e),
            }
        }

        Ok(written)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.workflow.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn find_documents(&self, input_dir: &Path, output_dir: &Path, target_language: &str) -> Vec<(PathBuf, PathBuf)> {
        let suffix = format!("_{}", target_language);
        let mut files = Vec::new();

        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.is_supported(path) {
                continue;
            }
            // Skip our own earlier output
            let already_translated = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().ends_with(&suffix))
                .unwrap_or(false);
            if already_translated {
                continue;
            }

            let relative = pathdiff::diff_paths(path, input_dir).unwrap_or_else(|| path.to_path_buf());
            let file_name = match output_file_name(path, target_language) {
                Ok(name) => name,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let output = match relative.parent() {
                Some(parent) => output_dir.join(parent).join(file_name),
                None => output_dir.join(file_name),
            };
            files.push((path.to_path_buf(), output));
        }

        files.sort();
        files
    }
}

async fn translate_one(
    orchestrator: &TranslationOrchestrator,
    input_path: &Path,
    output_path: &Path,
    options: &TranslateOptions,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<TranslationReport> {
    if !input_path.exists() {
        return Err(TransloomError::FileNotFound(input_path.display().to_string()));
    }

    let kind = DocumentKind::from_path(input_path);
    info!("Translating {} ({:?}) to {}", input_path.display(), kind, options.target_language);

    let report = match kind {
        DocumentKind::Subtitle => {
            let entries = subtitle::read_srt(input_path).await?;
            let (translated, report) = orchestrator
                .translate_entries_with_report(&entries, &SubtitleOptions::from(options), on_progress)
                .await?;
            subtitle::write_srt(&translated, output_path).await?;
            report
        }
        DocumentKind::PlainText => {
            let content = fs::read_to_string(input_path).await?;
            let (translated, report) = orchestrator
                .translate_with_report(&content, options, on_progress)
                .await?;
            fs::write(output_path, translated).await?;
            report
        }
    };

    info!("Wrote {}", output_path.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use crate::backend::MockBackend;
    use crate::dictionary::PassThrough;
    use crate::segment::Segmenter;
    use crate::translate::Tone;

    fn options() -> TranslateOptions {
        TranslateOptions {
            model: "llama3.2:3b".to_string(),
            target_language: "vi".to_string(),
            preserve_context: true,
            tone: Tone::Neutral,
        }
    }

    fn workflow(mock: MockBackend) -> Workflow {
        let config = Config::default();
        let orchestrator = TranslationOrchestrator::new(
            Segmenter::new(&config.segmenter),
            Arc::new(mock),
            Arc::new(PassThrough),
            config.translate.context_chars,
        );
        Workflow::with_orchestrator(config, orchestrator)
    }

    fn echo_backend() -> MockBackend {
        let mut mock = MockBackend::new();
        mock.expect_preflight().returning(|_: &str| Ok(()));
        mock.expect_send().returning(|prompt: &str, _: &str| {
            if prompt.contains("subtitle lines") {
                Ok("Dòng một.".to_string())
            } else {
                Ok("Văn bản đã dịch.".to_string())
            }
        });
        mock
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path("movie.srt"), DocumentKind::Subtitle);
        assert_eq!(DocumentKind::from_path("MOVIE.SRT"), DocumentKind::Subtitle);
        assert_eq!(DocumentKind::from_path("notes.txt"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_path("README"), DocumentKind::PlainText);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("dir/movie.srt", "ja").unwrap(), "movie_ja.srt");
        assert_eq!(output_file_name("chapter", "vi").unwrap(), "chapter_vi");
    }

    #[tokio::test]
    async fn test_translate_single_subtitle_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.srt");
        input.write_str("1\n00:00:01,000 --> 00:00:02,000\nLine one.\n").unwrap();
        let output = temp.child("movie_vi.srt");

        let report = workflow(echo_backend())
            .translate_file(input.path(), output.path(), &options(), None)
            .await
            .unwrap();

        output.assert("1\n00:00:01,000 --> 00:00:02,000\nDòng một.\n");
        assert_eq!(report.chunks, 1);
    }

    #[tokio::test]
    async fn test_subtitle_file_drops_malformed_blocks() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("show.srt");
        input
            .write_str("1\r\n00:00:01,000 --> 00:00:02,000\r\nLine one.\r\n\r\nbroken block\r\n")
            .unwrap();
        let output = temp.child("show_vi.srt");

        workflow(echo_backend())
            .translate_file(input.path(), output.path(), &options(), None)
            .await
            .unwrap();

        let written = subtitle::read_srt(output.path()).await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].text, "Dòng một.");
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = workflow(MockBackend::new())
            .translate_file(temp.path().join("absent.txt"), temp.path().join("out.txt"), &options(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransloomError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("cover.png");
        input.write_str("binary").unwrap();
        let err = workflow(MockBackend::new())
            .translate_file(input.path(), temp.path().join("cover_vi.png"), &options(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransloomError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_translate_directory_mirrors_layout() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("Hello.").unwrap();
        temp.child("nested/b.srt")
            .write_str("1\n00:00:01,000 --> 00:00:02,000\nHi.\n")
            .unwrap();
        temp.child("skip.png").write_str("not text").unwrap();
        temp.child("old_vi.txt").write_str("already done").unwrap();
        let out = assert_fs::TempDir::new().unwrap();

        let written = workflow(echo_backend())
            .translate_directory(temp.path(), Some(out.path()), &options())
            .await
            .unwrap();

        assert_eq!(written, 2);
        out.child("a_vi.txt").assert("Văn bản đã dịch.");
        out.child("nested/b_vi.srt").assert("1\n00:00:01,000 --> 00:00:02,000\nDòng một.\n");
        assert!(!out.child("skip_vi.png").path().exists());
    }

    #[tokio::test]
    async fn test_directory_input_must_exist() {
        let err = workflow(MockBackend::new())
            .translate_directory("/nonexistent/dir", None::<&Path>, &options())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
