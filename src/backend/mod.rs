use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::{BackendKind, Config};

pub mod local;
pub mod remote;

/// Errors surfaced by a transcription backend after its own retry policy
/// has been exhausted.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription timed out: {0}")]
    Timeout(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("model failure: {0}")]
    Model(String),

    #[error("rate limited: {0}")]
    RateLimited(String),
}

/// One timed text segment. Times are seconds from the start of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Capability interface shared by the local-model and remote-API backends.
///
/// The orchestrator depends on this trait only and never branches on which
/// implementation is behind it; selection happens once at startup.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe the audio file into an ordered sequence of timed segments.
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Vec<Segment>, TranscriptionError>;
}

/// Build the backend selected in the configuration.
pub fn create_backend(config: &Config) -> crate::Result<Arc<dyn TranscriptionBackend>> {
    match config.backend {
        BackendKind::Local => {
            let backend = local::LocalModelBackend::load(&config.local)?;
            Ok(Arc::new(backend))
        }
        BackendKind::Remote => {
            let backend = remote::RemoteApiBackend::new(&config.remote)?;
            Ok(Arc::new(backend))
        }
    }
}
