// src/captions/ffmpeg.rs
use super::CaptionError;
use std::path::Path;
use tokio::process::Command;

/// Run an FFmpeg command, turning a non-zero exit into an error carrying stderr
pub async fn execute_ffmpeg_command(mut command: Command) -> Result<String, String> {
    tracing::debug!("Executing FFmpeg: {:?}", command);

    let output = command
        .output()
        .await
        .map_err(|e| format!("Failed to execute FFmpeg: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("FFmpeg error: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Extract a small mono speech track suitable for transcription
pub async fn extract_speech_audio(input_file: &Path, output_file: &Path) -> Result<(), CaptionError> {
    let mut command = Command::new("ffmpeg");
    command
        .arg("-i")
        .arg(input_file)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg("16000")
        .arg("-acodec")
        .arg("libmp3lame")
        .arg("-b:a")
        .arg("32k")
        .arg("-y")
        .arg(output_file)
        .kill_on_drop(true);

    execute_ffmpeg_command(command)
        .await
        .map(|_| ())
        .map_err(CaptionError::AudioExtraction)
}

/// Check that FFmpeg is on the PATH
pub async fn check_ffmpeg_available() -> Result<(), String> {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .map_err(|_| "FFmpeg not found. Please install FFmpeg.".to_string())?;
    Ok(())
}
