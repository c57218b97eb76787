// src/captions/whisper_client.rs
// Speech-to-text client for OpenAI-compatible transcription APIs (Whisper and friends)

use super::{ffmpeg, CaptionError, CaptionGenerator};
use crate::config::CaptionsConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Clone)]
pub struct WhisperCaptioner {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

impl WhisperCaptioner {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url,
            model,
        }
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &CaptionsConfig) -> Option<Self> {
        config
            .api_key
            .clone()
            .map(|api_key| Self::new(api_key, config.api_url.clone(), config.model.clone()))
    }

    /// Upload an audio file and get back a WebVTT document
    pub async fn transcribe_to_vtt(&self, audio_path: &Path) -> Result<String, CaptionError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "vtt")
            .part("file", Part::bytes(audio).file_name(file_name).mime_str("audio/mpeg")?);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CaptionError::Service {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let track = response.text().await?;
        validate_webvtt(&track)?;
        Ok(track)
    }
}

#[async_trait]
impl CaptionGenerator for WhisperCaptioner {
    async fn generate(&self, video_path: &Path, output_path: &Path) -> Result<(), CaptionError> {
        if !tokio::fs::try_exists(video_path).await? {
            return Err(CaptionError::MediaMissing(video_path.to_path_buf()));
        }

        // Deleted on drop, also when a timed-out attempt is cancelled mid-request
        let audio = audio_scratch_file(video_path)?;
        ffmpeg::extract_speech_audio(video_path, audio.path()).await?;

        let track = self.transcribe_to_vtt(audio.path()).await?;
        tokio::fs::write(output_path, track).await?;
        tracing::info!("Wrote caption track {}", output_path.display());

        Ok(())
    }
}

/// Scratch file for the extracted audio, in the video's directory
fn audio_scratch_file(video_path: &Path) -> std::io::Result<NamedTempFile> {
    let dir = video_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tempfile::Builder::new()
        .prefix(".captions-")
        .suffix(".mp3")
        .tempfile_in(dir)
}

fn validate_webvtt(track: &str) -> Result<(), CaptionError> {
    // A BOM is allowed before the signature
    let body = track.trim_start_matches('\u{feff}');
    if body.starts_with("WEBVTT") {
        Ok(())
    } else {
        let preview: String = body.chars().take(40).collect();
        Err(CaptionError::InvalidTrack(format!(
            "missing WEBVTT header (starts with {:?})",
            preview
        )))
    }
}
