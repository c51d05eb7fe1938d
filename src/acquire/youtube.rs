use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{AcquiredAudio, AcquisitionError, AudioAcquirer};
use crate::orchestrator::WorkItem;

/// YouTube audio acquirer backed by yt-dlp.
///
/// Does a metadata pass first (title, declared language) so the language
/// gate can run cheaply, then extracts audio as MP3 into the pipeline's
/// working directory, named by video ID.
pub struct YtDlpAcquirer {
    yt_dlp_path: String,
    cookies_file: Option<PathBuf>,
}

impl YtDlpAcquirer {
    pub fn new(cookies_file: Option<PathBuf>) -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            cookies_file,
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.yt_dlp_path);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cookies) = &self.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd
    }

    /// Get video information using yt-dlp.
    async fn fetch_metadata(&self, url: &str) -> Result<Value, AcquisitionError> {
        tracing::debug!("extracting video info for: {}", url);

        let output = self
            .base_command()
            .args(["--dump-json", "--no-playlist", url])
            .output()
            .await
            .map_err(|e| AcquisitionError::Network(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| AcquisitionError::Unsupported(format!("unreadable yt-dlp metadata: {}", e)))
    }

    /// Download and extract audio directly with yt-dlp.
    async fn download_audio(
        &self,
        url: &str,
        output_path: &Path,
    ) -> Result<(), AcquisitionError> {
        tracing::debug!("downloading audio for: {}", url);

        let output = self
            .base_command()
            .arg("--output")
            .arg(output_path)
            .args([
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--format",
                "bestaudio/best",
                "--no-playlist",
                "--newline",
                url,
            ])
            .output()
            .await
            .map_err(|e| AcquisitionError::Network(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        if !output_path.exists() {
            return Err(AcquisitionError::NotFound(format!(
                "expected audio file missing after download: {}",
                output_path.display()
            )));
        }

        Ok(())
    }
}

/// Map yt-dlp stderr to the acquisition error taxonomy.
fn classify_failure(stderr: &str) -> AcquisitionError {
    let lower = stderr.to_lowercase();

    if lower.contains("unsupported url") {
        AcquisitionError::Unsupported(first_error_line(stderr))
    } else if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("404")
        || lower.contains("does not exist")
    {
        AcquisitionError::NotFound(first_error_line(stderr))
    } else {
        AcquisitionError::Network(first_error_line(stderr))
    }
}

fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.lines().next().unwrap_or("yt-dlp failed"))
        .trim()
        .to_string()
}

#[async_trait]
impl AudioAcquirer for YtDlpAcquirer {
    async fn acquire(
        &self,
        item: &WorkItem,
        workdir: &Path,
    ) -> Result<AcquiredAudio, AcquisitionError> {
        let info = self.fetch_metadata(&item.raw_input).await?;

        let title = info["title"].as_str().map(|s| s.to_string());
        let detected_language = info["language"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let duration = info["duration"].as_f64().map(|d| Duration::seconds(d as i64));

        let audio_path = workdir.join(format!("{}.mp3", item.canonical_id));
        self.download_audio(&item.raw_input, &audio_path).await?;

        tracing::info!(
            "downloaded audio for {} to {}",
            item.canonical_id,
            audio_path.display()
        );

        Ok(AcquiredAudio {
            audio_path,
            detected_language,
            title,
            duration,
        })
    }
}
