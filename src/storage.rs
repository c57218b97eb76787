// src/storage.rs
use crate::captions::caption_artifact_paths;
use crate::models::tutorial::TutorialType;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Public URL prefix the upload directory is served under
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A file written to the upload directory
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub file_path: PathBuf,
    pub media_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
}

/// Uploaded tutorial media on the local filesystem, laid out as
/// `<root>/videos/<uuid>.<ext>` and `<root>/pdfs/<uuid>.<ext>`
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_layout(&self) -> std::io::Result<()> {
        for kind in [TutorialType::Video, TutorialType::Pdf] {
            fs::create_dir_all(self.root.join(kind.media_subdir())).await?;
        }
        Ok(())
    }

    pub async fn save(
        &self,
        tutorial_type: TutorialType,
        original_name: &str,
        data: &[u8],
    ) -> std::io::Result<StoredMedia> {
        let extension = file_extension(original_name).unwrap_or_default();
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let subdir = tutorial_type.media_subdir();

        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).await?;
        let file_path = dir.join(&stored_name);

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::info!("Stored upload '{}' -> {}", original_name, file_path.display());

        Ok(StoredMedia {
            file_path,
            media_path: format!("{}/{}/{}", PUBLIC_PREFIX, subdir, stored_name),
            file_size: data.len() as i64,
            mime_type: detect_mime_type(original_name),
        })
    }

    /// Remove a media file plus any caption tracks next to it. Files that are already
    /// gone are skipped. Returns the paths that were actually removed.
    pub async fn remove_with_captions(&self, file_path: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let mut targets = vec![file_path.to_path_buf()];
        targets.extend(caption_artifact_paths(file_path));

        for target in targets {
            match fs::remove_file(&target).await {
                Ok(()) => removed.push(target),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn detect_mime_type(filename: &str) -> Option<String> {
    let mime_type = match file_extension(filename)?.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime_type.to_string())
}
