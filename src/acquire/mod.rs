use async_trait::async_trait;
use chrono::Duration;
use std::path::{Path, PathBuf};

pub mod local;
pub mod youtube;

use crate::orchestrator::{SourceKind, WorkItem};

/// Errors from the acquisition boundary.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("unsupported source: {0}")]
    Unsupported(String),

    #[error("acquisition cancelled")]
    Cancelled,
}

/// A local audio file plus best-effort source metadata.
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    /// Audio file inside the pipeline's working directory. Owned by the
    /// pipeline for the rest of the item's lifetime.
    pub audio_path: PathBuf,

    /// Language reported by the source, when the source knows it.
    pub detected_language: Option<String>,

    /// Title of the media if available.
    pub title: Option<String>,

    /// Duration of the audio if available.
    pub duration: Option<Duration>,
}

/// Boundary contract for turning a resolved source into a local audio file.
///
/// Implementations may be slow (seconds to minutes) and must fail with a
/// distinguishable [`AcquisitionError`] rather than hang.
#[async_trait]
pub trait AudioAcquirer: Send + Sync {
    async fn acquire(
        &self,
        item: &WorkItem,
        workdir: &Path,
    ) -> Result<AcquiredAudio, AcquisitionError>;
}

/// Production acquirer dispatching on the item's source kind: yt-dlp for
/// YouTube URLs, ffmpeg pass-through/transcode for local files.
pub struct SourceAcquirer {
    youtube: youtube::YtDlpAcquirer,
    local: local::LocalFileAcquirer,
}

impl SourceAcquirer {
    pub fn new(cookies_file: Option<PathBuf>) -> Self {
        Self {
            youtube: youtube::YtDlpAcquirer::new(cookies_file),
            local: local::LocalFileAcquirer::new(),
        }
    }
}

#[async_trait]
impl AudioAcquirer for SourceAcquirer {
    async fn acquire(
        &self,
        item: &WorkItem,
        workdir: &Path,
    ) -> Result<AcquiredAudio, AcquisitionError> {
        match item.source_kind {
            SourceKind::YouTubeUrl => self.youtube.acquire(item, workdir).await,
            SourceKind::LocalFile => self.local.acquire(item, workdir).await,
        }
    }
}
