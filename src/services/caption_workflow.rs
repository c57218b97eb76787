// src/services/caption_workflow.rs
use crate::error::ApiError;
use crate::jobs::CaptionJob;
use crate::models::tutorial::{CaptionStatusResponse, Tutorial};
use crate::store::CaptionOutcome;
use crate::AppState;
use std::path::PathBuf;

/// Entry points into the caption status state machine
pub struct CaptionWorkflow;

impl CaptionWorkflow {
    /// Queue generation for an attempt that has already been persisted as `generating`.
    /// If the worker is gone the attempt is recorded as failed straight away.
    pub async fn dispatch(state: &AppState, tutorial: &Tutorial, attempt: i64) {
        let job = CaptionJob {
            tutorial_id: tutorial.id.clone(),
            attempt,
            file_path: PathBuf::from(&tutorial.file_path),
            media_path: tutorial.media_path.clone(),
        };

        if let Err(job) = state.caption_queue.enqueue(job) {
            tracing::error!(
                tutorial_id = %job.tutorial_id,
                attempt = job.attempt,
                "Caption worker is not running, marking attempt as failed"
            );
            if let Err(e) = state
                .store
                .finish_caption_attempt(&job.tutorial_id, job.attempt, &CaptionOutcome::Failed)
                .await
            {
                tracing::error!(tutorial_id = %job.tutorial_id, "Failed to record caption failure: {}", e);
            }
        }
    }

    /// Force a new attempt for an existing video tutorial. Returns the new attempt token.
    pub async fn regenerate(state: &AppState, tutorial_id: &str) -> Result<i64, ApiError> {
        let tutorial = state
            .store
            .get(tutorial_id)
            .await?
            .ok_or_else(|| ApiError::tutorial_not_found(tutorial_id))?;

        if !tutorial.is_video() {
            return Err(ApiError::InvalidRequest(
                "Captions can only be generated for video tutorials".to_string(),
            ));
        }

        if !tokio::fs::try_exists(&tutorial.file_path).await? {
            tracing::warn!(tutorial_id = %tutorial_id, file = %tutorial.file_path, "Media file missing, not regenerating");
            return Err(ApiError::NotFound(format!(
                "Media file for tutorial {} not found",
                tutorial_id
            )));
        }

        let attempt = state
            .store
            .begin_caption_attempt(tutorial_id)
            .await?
            .ok_or_else(|| ApiError::tutorial_not_found(tutorial_id))?;

        tracing::info!(tutorial_id = %tutorial_id, attempt, "🔁 Regenerating captions");
        Self::dispatch(state, &tutorial, attempt).await;

        Ok(attempt)
    }

    pub async fn status(state: &AppState, tutorial_id: &str) -> Result<CaptionStatusResponse, ApiError> {
        let tutorial = state
            .store
            .get(tutorial_id)
            .await?
            .ok_or_else(|| ApiError::tutorial_not_found(tutorial_id))?;

        Ok(CaptionStatusResponse::from(&tutorial))
    }
}
