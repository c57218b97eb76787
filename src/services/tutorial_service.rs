// src/services/tutorial_service.rs
use super::CaptionWorkflow;
use crate::error::ApiError;
use crate::models::tutorial::{NewTutorial, Tutorial, TutorialType};
use crate::AppState;
use std::path::Path;
use uuid::Uuid;

/// A validated tutorial upload, ready to be stored
#[derive(Debug, Clone)]
pub struct TutorialUpload {
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    pub tutorial_type: TutorialType,
    pub file_name: String,
    pub data: Vec<u8>,
}

pub struct TutorialService;

impl TutorialService {
    /// Store the media, persist the record, then (videos only) queue caption generation.
    /// The record is readable as `generating` before the job is queued.
    pub async fn create(state: &AppState, upload: TutorialUpload) -> Result<Tutorial, ApiError> {
        let stored = state
            .media
            .save(upload.tutorial_type, &upload.file_name, &upload.data)
            .await?;

        let tutorial = NewTutorial {
            title: upload.title,
            course: upload.course,
            description: upload.description,
            tutorial_type: upload.tutorial_type,
            media_path: stored.media_path,
            file_path: stored.file_path.to_string_lossy().to_string(),
            file_size: stored.file_size,
            mime_type: stored.mime_type,
        }
        .into_tutorial(Uuid::new_v4().to_string());

        if let Err(e) = state.store.insert(&tutorial).await {
            tracing::error!("Failed to save tutorial {}: {}", tutorial.id, e);
            // Don't leave an unreferenced upload behind
            if let Err(cleanup_err) = tokio::fs::remove_file(&stored.file_path).await {
                tracing::warn!(
                    "Failed to remove upload {} after insert failure: {}",
                    stored.file_path.display(),
                    cleanup_err
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            tutorial_id = %tutorial.id,
            tutorial_type = %tutorial.tutorial_type,
            course = %tutorial.course,
            "Created tutorial"
        );

        if tutorial.is_video() {
            CaptionWorkflow::dispatch(state, &tutorial, tutorial.caption_attempt).await;
        }

        Ok(tutorial)
    }

    pub async fn get(state: &AppState, tutorial_id: &str) -> Result<Tutorial, ApiError> {
        state
            .store
            .get(tutorial_id)
            .await?
            .ok_or_else(|| ApiError::tutorial_not_found(tutorial_id))
    }

    pub async fn list(state: &AppState, course: Option<&str>) -> Result<Vec<Tutorial>, ApiError> {
        Ok(state.store.list(course).await?)
    }

    /// Delete the record, then the media file and its caption tracks.
    /// An attempt finishing concurrently either publishes before the sweep or finds the
    /// record gone and discards its own track.
    pub async fn delete(state: &AppState, tutorial_id: &str) -> Result<Tutorial, ApiError> {
        let _tracks = state.caption_queue.lock_tracks().await;

        let deleted = state
            .store
            .delete(tutorial_id)
            .await?
            .ok_or_else(|| ApiError::tutorial_not_found(tutorial_id))?;

        match state
            .media
            .remove_with_captions(Path::new(&deleted.file_path))
            .await
        {
            Ok(removed) => tracing::debug!(tutorial_id = %tutorial_id, "Removed files: {:?}", removed),
            Err(e) => tracing::warn!(
                tutorial_id = %tutorial_id,
                file = %deleted.file_path,
                "Tutorial deleted but its files could not be removed: {}",
                e
            ),
        }

        tracing::info!(tutorial_id = %tutorial_id, "🗑️ Deleted tutorial");
        Ok(deleted)
    }
}
