// src/handlers/captions.rs
use crate::error::ApiError;
use crate::models::tutorial::{CaptionStatusResponse, CaptionsStatus, RegenerateResponse};
use crate::services::CaptionWorkflow;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn caption_routes() -> Router {
    Router::new()
        .route("/tutorials/:id/captions/status", get(get_caption_status))
        .route("/tutorials/:id/captions/regenerate", post(regenerate_captions))
}

/// GET /tutorials/:id/captions/status - read-only, safe to poll
pub async fn get_caption_status(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<CaptionStatusResponse>, ApiError> {
    Ok(Json(CaptionWorkflow::status(&state, &id).await?))
}

/// POST /tutorials/:id/captions/regenerate - starts a new attempt and returns immediately
pub async fn regenerate_captions(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    CaptionWorkflow::regenerate(&state, &id).await?;

    Ok(Json(RegenerateResponse {
        message: "Caption regeneration started".to_string(),
        status: CaptionsStatus::Generating,
    }))
}
