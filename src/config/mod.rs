use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Which transcription backend to run. Chosen once per process, never per
/// item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Bundled whisper model running on this machine
    Local,
    /// Hosted transcription API
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcription backend selection
    pub backend: BackendKind,

    /// Target language code for transcription, e.g. "ja"
    pub language: String,

    /// Skip the language gate entirely
    pub bypass_language_check: bool,

    /// Directory where subtitle artifacts are written
    pub output_dir: PathBuf,

    /// Overwrite an existing subtitle artifact on re-run of the same source
    pub overwrite_existing: bool,

    /// Keep extracted audio files after the item reaches a terminal stage
    pub keep_audio: bool,

    /// Clipboard polling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Optional wall-clock budget for one item across all stages
    pub item_timeout_secs: Option<u64>,

    /// Cookies file handed to yt-dlp for gated content
    pub cookies_file: Option<PathBuf>,

    /// Remote backend settings
    pub remote: RemoteConfig,

    /// Local model settings
    pub local: LocalModelConfig,

    /// Companion player delivery settings
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// OpenAI-compatible transcription endpoint
    pub api_url: String,

    /// API credential (bearer token)
    pub api_key: String,

    /// Model name selector
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    /// Path to a GGML whisper model file
    pub model_path: PathBuf,

    /// Inference threads
    pub threads: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Push finished subtitles to the companion player
    pub enabled: bool,

    /// Subtitle-load endpoint of the companion player
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Remote,
            language: "ja".to_string(),
            bypass_language_check: false,
            output_dir: PathBuf::from("subtitles"),
            overwrite_existing: true,
            keep_audio: false,
            poll_interval_ms: 1000,
            item_timeout_secs: None,
            cookies_file: None,
            remote: RemoteConfig::default(),
            local: LocalModelConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/audio/transcriptions".to_string(),
            api_key: String::new(),
            model: "whisper-large-v3-turbo".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            threads: 4,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://127.0.0.1:8766/asbplayer/load-subtitles".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create a default one.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            Ok(config)
        } else {
            let config = Self::default();
            config.save(&config_path).await?;
            tracing::info!("wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to file.
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path.
    fn config_path() -> Result<PathBuf> {
        // A config.yaml in the working directory wins, for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("clipscribe").join("config.yaml"))
    }

    /// Validate configuration for the selected backend.
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            anyhow::bail!("Target language must be configured");
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be non-zero");
        }

        match self.backend {
            BackendKind::Remote => {
                if self.remote.api_key.trim().is_empty() {
                    anyhow::bail!("Remote backend selected but no API key configured");
                }
            }
            BackendKind::Local => {
                if !self.local.model_path.exists() {
                    anyhow::bail!(
                        "Local backend selected but model file not found: {}",
                        self.local.model_path.display()
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.backend, BackendKind::Remote);
        assert_eq!(parsed.language, "ja");
        assert_eq!(parsed.poll_interval_ms, 1000);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let parsed: Config = serde_yaml::from_str("language: en\nbackend: local\n").unwrap();
        assert_eq!(parsed.backend, BackendKind::Local);
        assert_eq!(parsed.language, "en");
        assert!(parsed.overwrite_existing);
        assert_eq!(parsed.delivery.url, DeliveryConfig::default().url);
    }

    #[test]
    fn remote_backend_requires_api_key() {
        let mut config = Config::default();
        config.backend = BackendKind::Remote;
        config.remote.api_key = String::new();
        assert!(config.validate().is_err());

        config.remote.api_key = "gsk_test".to_string();
        assert!(config.validate().is_ok());
    }
}
