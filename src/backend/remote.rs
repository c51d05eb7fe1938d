use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{Segment, TranscriptionBackend, TranscriptionError};
use crate::config::RemoteConfig;
use crate::Result;

/// Hosted transcription endpoints cap request bodies at 25 MB.
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Transcription backend calling a hosted, OpenAI-compatible transcription
/// endpoint.
///
/// Applies its own request timeout and exactly one automatic retry on
/// transient network failure; only exhausted retries surface to the
/// orchestrator.
pub struct RemoteApiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

/// Failure of a single request attempt, before retry policy is applied.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

/// verbose_json response shape
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

impl RemoteApiBackend {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Pick the file to upload. Audio over the endpoint's size cap is
    /// re-encoded to 16 kHz mono 128k MP3 first; the returned flag marks the
    /// re-encoded copy for removal after the request.
    async fn prepare_upload(
        &self,
        audio_path: &Path,
    ) -> std::result::Result<(PathBuf, bool), TranscriptionError> {
        let len = tokio::fs::metadata(audio_path)
            .await
            .map_err(|e| {
                TranscriptionError::Model(format!(
                    "cannot stat audio file {}: {}",
                    audio_path.display(),
                    e
                ))
            })?
            .len();

        if !exceeds_upload_limit(len) {
            return Ok((audio_path.to_path_buf(), false));
        }

        let reduced = audio_path.with_extension("16k.mp3");
        tracing::info!(
            "audio is {:.1} MB, re-encoding before upload",
            len as f64 / (1024.0 * 1024.0)
        );

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(audio_path)
            .args(["-ar", "16000", "-ab", "128k", "-ac", "1", "-y"])
            .arg(&reduced)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriptionError::Model(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Model(format!(
                "ffmpeg re-encode failed: {}",
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }

        let reduced_len = tokio::fs::metadata(&reduced)
            .await
            .map_err(|e| {
                TranscriptionError::Model(format!(
                    "cannot stat re-encoded audio {}: {}",
                    reduced.display(),
                    e
                ))
            })?
            .len();
        if exceeds_upload_limit(reduced_len) {
            let _ = fs_err::remove_file(&reduced);
            return Err(TranscriptionError::Model(format!(
                "audio still exceeds the 25 MB upload limit after re-encoding ({} bytes)",
                reduced_len
            )));
        }

        Ok((reduced, true))
    }

    async fn request(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> std::result::Result<Vec<Segment>, AttemptError> {
        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            // Surface as a non-retryable status-shaped failure; the file is
            // pipeline-owned and will not appear on a second attempt.
            AttemptError::Status(
                StatusCode::BAD_REQUEST,
                format!("cannot read audio file {}: {}", audio_path.display(), e),
            )
        })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(AttemptError::Transport)?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("language", language.to_string())
            .text("temperature", "0");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Status(status, truncate(&body, 300)));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(AttemptError::Transport)?;

        if parsed.segments.is_empty() {
            return Err(AttemptError::Status(
                StatusCode::OK,
                "response contained no segments".to_string(),
            ));
        }

        Ok(parsed
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
            })
            .collect())
    }
}

fn exceeds_upload_limit(len: u64) -> bool {
    len > MAX_UPLOAD_BYTES
}

/// One retry, for failures that a second attempt can plausibly fix.
fn is_transient(error: &AttemptError) -> bool {
    match error {
        AttemptError::Transport(e) => e.is_timeout() || e.is_connect(),
        AttemptError::Status(status, _) => status.is_server_error(),
    }
}

fn to_transcription_error(error: AttemptError) -> TranscriptionError {
    match error {
        AttemptError::Transport(e) if e.is_timeout() => {
            TranscriptionError::Timeout(e.to_string())
        }
        AttemptError::Transport(e) => TranscriptionError::Model(e.to_string()),
        AttemptError::Status(status, body) => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TranscriptionError::Auth(format!("{}: {}", status, body))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                TranscriptionError::RateLimited(format!("{}: {}", status, body))
            }
            _ => TranscriptionError::Model(format!("{}: {}", status, body)),
        },
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

#[async_trait]
impl TranscriptionBackend for RemoteApiBackend {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> std::result::Result<Vec<Segment>, TranscriptionError> {
        let (upload_path, temporary) = self.prepare_upload(audio_path).await?;

        let result = match self.request(&upload_path, language).await {
            Ok(segments) => Ok(segments),
            Err(first) if is_transient(&first) => {
                tracing::warn!(
                    "transient transcription failure, retrying once: {:?}",
                    first
                );
                self.request(&upload_path, language)
                    .await
                    .map_err(to_transcription_error)
            }
            Err(first) => Err(to_transcription_error(first)),
        };

        if temporary {
            if let Err(e) = fs_err::remove_file(&upload_path) {
                tracing::warn!("could not remove {}: {}", upload_path.display(), e);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbose_json_segments() {
        let json = r#"{
            "text": "こんにちは world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.0, "text": " こんにちは "},
                {"id": 1, "start": 2.0, "end": 4.5, "text": " world"}
            ]
        }"#;

        let parsed: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0].start, 0.0);
        assert_eq!(parsed.segments[1].text.trim(), "world");
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let retryable = AttemptError::Status(StatusCode::BAD_GATEWAY, String::new());
        assert!(is_transient(&retryable));

        let auth = AttemptError::Status(StatusCode::UNAUTHORIZED, String::new());
        assert!(!is_transient(&auth));

        let rate = AttemptError::Status(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(!is_transient(&rate));
    }

    #[test]
    fn status_codes_map_to_the_error_taxonomy() {
        let auth = to_transcription_error(AttemptError::Status(
            StatusCode::FORBIDDEN,
            "no".to_string(),
        ));
        assert!(matches!(auth, TranscriptionError::Auth(_)));

        let rate = to_transcription_error(AttemptError::Status(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
        ));
        assert!(matches!(rate, TranscriptionError::RateLimited(_)));

        let model = to_transcription_error(AttemptError::Status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom".to_string(),
        ));
        assert!(matches!(model, TranscriptionError::Model(_)));
    }

    #[test]
    fn upload_limit_is_25_megabytes() {
        assert!(!exceeds_upload_limit(0));
        assert!(!exceeds_upload_limit(25 * 1024 * 1024));
        assert!(exceeds_upload_limit(25 * 1024 * 1024 + 1));
    }

    #[tokio::test]
    async fn small_audio_uploads_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.mp3");
        fs_err::write(&audio, b"well under the cap").unwrap();

        let backend = RemoteApiBackend::new(&RemoteConfig::default()).unwrap();
        let (upload_path, temporary) = backend.prepare_upload(&audio).await.unwrap();

        assert_eq!(upload_path, audio);
        assert!(!temporary);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "あいうえお";
        let cut = truncate(text, 4);
        assert!(cut.starts_with('あ'));
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 300), "short");
    }
}
