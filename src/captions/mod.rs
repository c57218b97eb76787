// src/captions/mod.rs
//! Caption track generation. A `CaptionGenerator` turns a stored video into a WebVTT
//! file at a path it is given; the worker in `jobs` decides whether that file becomes the
//! published track next to the video.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod ffmpeg;
pub mod whisper_client;

pub use whisper_client::WhisperCaptioner;

pub const CAPTION_TRACK_EXTENSION: &str = "vtt";

/// Extensions of caption files that may sit next to a media file and go with it on delete
pub const CAPTION_SIBLING_EXTENSIONS: [&str; 2] = ["vtt", "srt"];

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Media file not found: {0}")]
    MediaMissing(PathBuf),
    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),
    #[error("Captioning request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Captioning service error ({status}): {body}")]
    Service { status: u16, body: String },
    #[error("Captioning service returned an invalid track: {0}")]
    InvalidTrack(String),
    #[error("Caption generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Captioning is not configured (set CAPTIONS_API_KEY)")]
    NotConfigured,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    /// Write a caption track for `video_path` to `output_path`
    async fn generate(&self, video_path: &Path, output_path: &Path) -> Result<(), CaptionError>;
}

/// Stand-in used when no speech-to-text credentials are configured. Every attempt fails,
/// which leaves the tutorial in `failed` until an operator configures it and regenerates.
pub struct UnconfiguredCaptioner;

#[async_trait]
impl CaptionGenerator for UnconfiguredCaptioner {
    async fn generate(&self, _video_path: &Path, _output_path: &Path) -> Result<(), CaptionError> {
        Err(CaptionError::NotConfigured)
    }
}

/// Replace the extension of a media path (public URL path or disk path) with the
/// caption-track extension: `/uploads/videos/v1.mp4` -> `/uploads/videos/v1.vtt`.
pub fn caption_track_path(media_path: &str) -> String {
    with_extension(media_path, CAPTION_TRACK_EXTENSION)
}

/// Where one attempt writes its track before it is published:
/// `uploads/videos/v1.mp4`, attempt 3 -> `uploads/videos/v1.3.vtt.tmp`
pub fn staged_track_path(file_path: &Path, attempt: i64) -> PathBuf {
    file_path.with_extension(format!("{}.{}.tmp", attempt, CAPTION_TRACK_EXTENSION))
}

/// Every caption artifact that may exist for a media file on disk
pub fn caption_artifact_paths(file_path: &Path) -> Vec<PathBuf> {
    CAPTION_SIBLING_EXTENSIONS
        .iter()
        .map(|ext| file_path.with_extension(ext))
        .collect()
}

fn with_extension(path: &str, extension: &str) -> String {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let stem_end = match path[name_start..].rfind('.') {
        // A leading dot is a hidden file, not an extension
        Some(dot) if dot > 0 => name_start + dot,
        _ => path.len(),
    };
    format!("{}.{}", &path[..stem_end], extension)
}
