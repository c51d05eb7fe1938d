//! Clipscribe - a clipboard-watching subtitle generator
//!
//! This library watches the OS clipboard for YouTube links or local media file
//! paths, extracts audio, transcribes it through a pluggable backend (a local
//! whisper model or a hosted transcription API), renders timed SRT subtitles
//! and pushes them best-effort to a companion player for live sync.

pub mod acquire;
pub mod backend;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod gate;
pub mod orchestrator;
pub mod resolver;
pub mod subtitle;
pub mod utils;

pub use cli::Cli;
pub use config::{BackendKind, Config};
pub use orchestrator::{Orchestrator, Stage, WorkItem};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
