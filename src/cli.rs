use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by the translating commands; unset values come from config.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TranslationArgs {
    /// Target language code (e.g. vi, en, ja)
    #[arg(short, long)]
    pub target_lang: Option<String>,

    /// Model identifier (gemini-*, gpt-*, vendor/model for OpenRouter, else Ollama)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Tone profile: normal, novel or academic
    #[arg(long)]
    pub tone: Option<String>,

    /// Do not ask the model to preserve the author's voice and terminology
    #[arg(long)]
    pub no_context: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a text or subtitle (.srt) file
    Translate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to <stem>_<lang>.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        translation: TranslationArgs,
    },

    /// Translate every text and subtitle file in a directory
    Batch {
        /// Input directory
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for translated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Documents translated at the same time
        #[arg(long)]
        parallel: Option<usize>,

        #[command(flatten)]
        translation: TranslationArgs,
    },

    /// Check that the backend for a model is configured and reachable
    Check {
        /// Model identifier to check
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Destination path
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
}
