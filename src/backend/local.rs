use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{Segment, TranscriptionBackend, TranscriptionError};
use crate::config::LocalModelConfig;
use crate::Result;

/// Transcription backend running a bundled GGML whisper model in-process.
///
/// Audio is first resampled to 16 kHz mono WAV with ffmpeg, then inference
/// runs on a blocking worker so the pipeline lane's executor thread is not
/// pinned for minutes.
pub struct LocalModelBackend {
    ctx: Arc<WhisperContext>,
    threads: i32,
}

impl LocalModelBackend {
    /// Load the GGML model from the configured path.
    pub fn load(config: &LocalModelConfig) -> Result<Self> {
        let path = &config.model_path;
        if !path.exists() {
            anyhow::bail!("whisper model not found: {}", path.display());
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("model path is not valid UTF-8: {}", path.display()))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| anyhow::anyhow!("failed to load whisper model: {}", e))?;

        tracing::info!("loaded whisper model from {}", path.display());

        Ok(Self {
            ctx: Arc::new(ctx),
            threads: config.threads,
        })
    }

    /// Resample to the 16 kHz mono WAV whisper expects.
    async fn prepare_pcm_wav(
        &self,
        audio_path: &Path,
    ) -> std::result::Result<PathBuf, TranscriptionError> {
        let wav_path = audio_path.with_extension("16k.wav");

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(audio_path)
            .args(["-ar", "16000", "-ac", "1", "-f", "wav", "-y"])
            .arg(&wav_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriptionError::Model(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Model(format!(
                "ffmpeg resample failed: {}",
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }

        Ok(wav_path)
    }
}

/// Decode a 16-bit PCM WAV into the f32 samples whisper consumes.
fn read_samples(wav_path: &Path) -> std::result::Result<Vec<f32>, TranscriptionError> {
    let reader = hound::WavReader::open(wav_path)
        .map_err(|e| TranscriptionError::Model(format!("cannot read wav: {}", e)))?;

    reader
        .into_samples::<i16>()
        .map(|s| {
            s.map(|v| v as f32 / 32768.0)
                .map_err(|e| TranscriptionError::Model(format!("wav decode error: {}", e)))
        })
        .collect()
}

#[async_trait]
impl TranscriptionBackend for LocalModelBackend {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> std::result::Result<Vec<Segment>, TranscriptionError> {
        let wav_path = self.prepare_pcm_wav(audio_path).await?;

        let ctx = Arc::clone(&self.ctx);
        let threads = self.threads;
        let language = language.to_string();
        let wav = wav_path.clone();

        let result = tokio::task::spawn_blocking(move || {
            let samples = read_samples(&wav)?;
            if samples.is_empty() {
                return Err(TranscriptionError::Model("audio contains no samples".into()));
            }

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(language.as_str()));
            params.set_n_threads(threads);
            params.set_print_progress(false);
            params.set_print_realtime(false);

            let mut state = ctx
                .create_state()
                .map_err(|e| TranscriptionError::Model(format!("whisper state: {}", e)))?;

            state
                .full(params, &samples)
                .map_err(|e| TranscriptionError::Model(format!("whisper inference: {}", e)))?;

            let n_segments = state
                .full_n_segments()
                .map_err(|e| TranscriptionError::Model(format!("segment count: {}", e)))?;

            let mut segments = Vec::with_capacity(n_segments as usize);
            for i in 0..n_segments {
                let text = state
                    .full_get_segment_text(i)
                    .map_err(|e| TranscriptionError::Model(format!("segment {}: {}", i, e)))?;

                // whisper timestamps are centiseconds
                let start = state.full_get_segment_t0(i).unwrap_or(0).max(0) as f64 / 100.0;
                let end = state.full_get_segment_t1(i).unwrap_or(0).max(0) as f64 / 100.0;

                segments.push(Segment {
                    start,
                    end,
                    text: text.trim().to_string(),
                });
            }

            Ok(segments)
        })
        .await
        .map_err(|e| TranscriptionError::Model(format!("inference task panicked: {}", e)))?;

        // The intermediate wav lives in the pipeline workdir; remove it
        // eagerly so long sessions do not accumulate resampled copies.
        if let Err(e) = fs_err::remove_file(&wav_path) {
            tracing::warn!("could not remove {}: {}", wav_path.display(), e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn samples_are_normalized_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        write_wav(&wav, &[0, 16384, -16384, 32767, -32768]);

        let samples = read_samples(&wav).unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 1e-4);
        assert!((samples[2] + 0.5).abs() < 1e-4);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn missing_wav_is_a_model_error() {
        let err = read_samples(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(matches!(err, TranscriptionError::Model(_)));
    }
}
