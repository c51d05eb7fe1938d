//! Best-effort delivery of finished subtitles to the companion player.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use crate::config::DeliveryConfig;
use crate::Result;

/// Result of a delivery attempt. Unreachable is non-fatal by contract:
/// the subtitle artifact already exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Ack,
    Unreachable(String),
}

/// Sink for finished subtitle artifacts.
#[async_trait]
pub trait SubtitleSink: Send + Sync {
    async fn deliver(&self, subtitle_path: &Path) -> DeliveryOutcome;
}

/// Pushes subtitles to the companion player's subtitle-load endpoint so it
/// can display synced captions.
///
/// One `reqwest::Client` is reused for the life of the process, which keeps
/// a pooled connection to the player open and reconnects transparently when
/// the player restarts.
pub struct PlayerChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl PlayerChannel {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }
}

/// Build the player's load-subtitles payload: the file content, base64
/// encoded, under its artifact name.
fn payload(subtitle_path: &Path) -> Result<serde_json::Value> {
    let content = fs_err::read(subtitle_path)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);

    let name = subtitle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles.srt".to_string());

    Ok(json!({
        "files": [{
            "name": name,
            "base64": encoded,
        }]
    }))
}

#[async_trait]
impl SubtitleSink for PlayerChannel {
    async fn deliver(&self, subtitle_path: &Path) -> DeliveryOutcome {
        let body = match payload(subtitle_path) {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::Unreachable(format!("payload: {}", e)),
        };

        match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("player acknowledged {}", subtitle_path.display());
                DeliveryOutcome::Ack
            }
            Ok(response) => {
                DeliveryOutcome::Unreachable(format!("player returned {}", response.status()))
            }
            Err(e) => DeliveryOutcome::Unreachable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_encodes_file_under_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode 1.srt");
        fs_err::write(&path, "1\n00:00:00,000 --> 00:00:01,000\nhi\n\n").unwrap();

        let body = payload(&path).unwrap();
        let file = &body["files"][0];
        assert_eq!(file["name"], "episode 1.srt");

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(file["base64"].as_str().unwrap())
            .unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("00:00:01,000"));
    }

    #[test]
    fn payload_fails_for_missing_artifact() {
        assert!(payload(Path::new("/no/such/file.srt")).is_err());
    }
}
