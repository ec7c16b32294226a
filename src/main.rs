//! Transloom - chunked, context-preserving translation
//!
//! Command line entry point: translates text and subtitle files, single or
//! in batches, through the configured model backends.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use transloom::backend::BackendRouter;
use transloom::cli::{Args, Commands, TranslationArgs};
use transloom::config::Config;
use transloom::orchestrator::TranslateOptions;
use transloom::translate::Tone;
use transloom::workflow::{output_file_name, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate { input, output, translation } => {
            let options = translate_options(&config, &translation);
            let output = match output {
                Some(path) => path,
                None => input.with_file_name(output_file_name(&input, &options.target_language)?),
            };
            info!("Translating {} -> {}", input.display(), output.display());

            let progress = ProgressBar::new(0);
            progress.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] chunk {pos}/{len} {elapsed}")?
                    .progress_chars("=> "),
            );
            let on_progress = {
                let progress = progress.clone();
                move |current: usize, total: usize| {
                    progress.set_length(total as u64);
                    progress.set_position(current as u64);
                }
            };

            let workflow = Workflow::new(config)?;
            let report = workflow
                .translate_file(&input, &output, &options, Some(&on_progress))
                .await?;
            progress.finish_and_clear();

            println!(
                "Translated {} chunk(s) into {} ({} degraded, {} sentence(s) left untranslated)",
                report.chunks,
                output.display(),
                report.degraded_chunks,
                report.verbatim_pieces
            );
        }
        Commands::Batch { input_dir, output_dir, parallel, translation } => {
            if let Some(parallel) = parallel {
                config.workflow.max_parallel_documents = parallel;
            }
            let options = translate_options(&config, &translation);

            let workflow = Workflow::new(config)?;
            let written = workflow
                .translate_directory(&input_dir, output_dir.as_ref(), &options)
                .await?;
            println!("Translated {} file(s)", written);
        }
        Commands::Check { model } => {
            let model = model.unwrap_or_else(|| config.backend.model.clone());
            let router = BackendRouter::new(&config.backend)?;
            router.check(&model).await?;
            println!("Backend for '{}' is ready", model);
        }
        Commands::Init { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    info!("Transloom completed successfully");
    Ok(())
}

/// Merge command line overrides over the configured defaults
fn translate_options(config: &Config, args: &TranslationArgs) -> TranslateOptions {
    let mut options = TranslateOptions::from_config(config);
    if let Some(target_lang) = &args.target_lang {
        options.target_language = target_lang.clone();
    }
    if let Some(model) = &args.model {
        options.model = model.clone();
    }
    if let Some(tone) = &args.tone {
        options.tone = Tone::from_str(tone);
    }
    if args.no_context {
        options.preserve_context = false;
    }
    options
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".transloom").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "transloom.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so it does not mix with command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("transloom.log").display());

    Ok(())
}
