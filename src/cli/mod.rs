use clap::Parser;
use std::path::PathBuf;

use crate::config::BackendKind;

/// Thin flag surface; everything here overrides the config file.
#[derive(Parser, Debug)]
#[command(
    name = "clipscribe",
    about = "Watch the clipboard for YouTube links and media paths, generate timed subtitles",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ./config.yaml or the platform config dir)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Transcription backend to use
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Target language code, e.g. "ja"
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Process sources regardless of their detected language
    #[arg(long)]
    pub bypass_language_check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
