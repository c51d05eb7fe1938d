use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{AcquiredAudio, AcquisitionError, AudioAcquirer};
use crate::orchestrator::WorkItem;

/// Extensions copied through without transcoding.
const PASSTHROUGH_EXTENSIONS: &[&str] = &["mp3", "m4a", "mpga"];

/// Acquirer for media files already on disk.
///
/// Copies ready-to-use audio into the pipeline's working directory so the
/// pipeline owns its audio file either way, and extracts/transcodes audio
/// from everything else with ffmpeg. Local files carry no language
/// metadata, so detection is always unavailable here.
pub struct LocalFileAcquirer;

impl LocalFileAcquirer {
    pub fn new() -> Self {
        Self
    }

    async fn validate(&self, path: &Path) -> Result<(), AcquisitionError> {
        if !path.is_file() {
            return Err(AcquisitionError::NotFound(format!(
                "file does not exist: {}",
                path.display()
            )));
        }

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            AcquisitionError::NotFound(format!("cannot access {}: {}", path.display(), e))
        })?;
        if metadata.len() == 0 {
            return Err(AcquisitionError::Unsupported(format!(
                "file is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Extract audio to MP3 using ffmpeg.
    async fn transcode(&self, source: &Path, target: &Path) -> Result<(), AcquisitionError> {
        tracing::debug!(
            "transcoding {} -> {}",
            source.display(),
            target.display()
        );

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(source)
            .args(["-vn", "-acodec", "mp3", "-ab", "128k", "-ar", "44100", "-y"])
            .arg(target)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AcquisitionError::Unsupported(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquisitionError::Unsupported(format!(
                "ffmpeg could not extract audio from {}: {}",
                source.display(),
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }

        Ok(())
    }
}

impl Default for LocalFileAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioAcquirer for LocalFileAcquirer {
    async fn acquire(
        &self,
        item: &WorkItem,
        workdir: &Path,
    ) -> Result<AcquiredAudio, AcquisitionError> {
        let source = Path::new(&item.canonical_id);
        self.validate(source).await?;

        let title = source
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());

        let stem = title.as_deref().unwrap_or("audio");
        let audio_path = workdir.join(format!("{}.mp3", crate::utils::sanitize_filename(stem)));

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some(ext) if PASSTHROUGH_EXTENSIONS.contains(&ext) => {
                tokio::fs::copy(source, &audio_path).await.map_err(|e| {
                    AcquisitionError::NotFound(format!(
                        "cannot copy {}: {}",
                        source.display(),
                        e
                    ))
                })?;
            }
            _ => {
                self.transcode(source, &audio_path).await?;
            }
        }

        Ok(AcquiredAudio {
            audio_path,
            detected_language: None,
            title,
            duration: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::SourceKind;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let workdir = tempfile::tempdir().unwrap();
        let item = WorkItem::new(
            "/no/such/file.mp3",
            SourceKind::LocalFile,
            "/no/such/file.mp3".to_string(),
        );

        let err = LocalFileAcquirer::new()
            .acquire(&item, workdir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.mp3");
        fs_err::write(&file, b"").unwrap();

        let id = file.to_string_lossy().into_owned();
        let item = WorkItem::new(&id, SourceKind::LocalFile, id.clone());

        let err = LocalFileAcquirer::new()
            .acquire(&item, workdir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Unsupported(_)));
    }

    #[tokio::test]
    async fn mp3_files_are_copied_into_the_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let file = dir.path().join("talk.mp3");
        fs_err::write(&file, b"fake mp3 bytes").unwrap();

        let id = file.to_string_lossy().into_owned();
        let item = WorkItem::new(&id, SourceKind::LocalFile, id.clone());

        let acquired = LocalFileAcquirer::new()
            .acquire(&item, workdir.path())
            .await
            .unwrap();

        assert!(acquired.audio_path.starts_with(workdir.path()));
        assert!(acquired.audio_path.exists());
        assert_eq!(acquired.title.as_deref(), Some("talk"));
        assert!(acquired.detected_language.is_none());
    }
}
