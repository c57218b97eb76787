// src/handlers/tutorials.rs
use crate::error::ApiError;
use crate::models::tutorial::{MessageResponse, TutorialListResponse, TutorialResponse, TutorialType};
use crate::services::{TutorialService, TutorialUpload};
use crate::storage::file_extension;
use crate::AppState;
use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn tutorial_routes(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/tutorials", get(list_tutorials).post(create_tutorial))
        .route("/tutorials/:id", get(get_tutorial).delete(delete_tutorial))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Raw multipart fields before validation
#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    course: Option<String>,
    description: Option<String>,
    tutorial_type: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

impl UploadForm {
    fn validate(self) -> Result<TutorialUpload, ApiError> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::InvalidRequest(format!("Missing required field '{}'", field)))
        };

        let title = required(self.title, "title")?;
        let course = required(self.course, "course")?;
        let tutorial_type: TutorialType = required(self.tutorial_type, "type")?
            .parse()
            .map_err(|e: String| ApiError::InvalidRequest(format!("Invalid type: {}", e)))?;

        let (file_name, data) = self
            .file
            .ok_or_else(|| ApiError::InvalidRequest("Missing required field 'file'".to_string()))?;
        if data.is_empty() {
            return Err(ApiError::InvalidRequest("Uploaded file is empty".to_string()));
        }

        let extension = file_extension(&file_name).unwrap_or_default();
        if !tutorial_type.accepts_extension(&extension) {
            return Err(ApiError::InvalidRequest(format!(
                "File '{}' is not a valid {} upload",
                file_name, tutorial_type
            )));
        }

        Ok(TutorialUpload {
            title,
            course,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            tutorial_type,
            file_name,
            data,
        })
    }
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ApiError::InvalidRequest(format!("Malformed multipart body: {}", e))
    };
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::InvalidRequest("Field 'file' has no filename".to_string()))?;
                let data = field.bytes().await.map_err(malformed)?;
                form.file = Some((file_name, data.to_vec()));
            }
            "title" => form.title = Some(field.text().await.map_err(malformed)?),
            "course" => form.course = Some(field.text().await.map_err(malformed)?),
            "description" => form.description = Some(field.text().await.map_err(malformed)?),
            "type" => form.tutorial_type = Some(field.text().await.map_err(malformed)?),
            other => tracing::debug!("Skipping unknown upload field: {}", other),
        }
    }

    Ok(form)
}

/// POST /tutorials - upload a tutorial; videos start caption generation in the background
pub async fn create_tutorial(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TutorialResponse>), ApiError> {
    let upload = read_upload_form(multipart).await?.validate()?;
    let tutorial = TutorialService::create(&state, upload).await?;

    let is_video = tutorial.is_video();
    let mut response = TutorialResponse::from(tutorial);
    if is_video {
        response.captions_generating = Some(true);
    }

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub course: Option<String>,
}

/// GET /tutorials?course=
pub async fn list_tutorials(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TutorialListResponse>, ApiError> {
    let course = query.course.as_deref().filter(|c| !c.is_empty());
    let tutorials = TutorialService::list(&state, course).await?;

    Ok(Json(TutorialListResponse {
        success: true,
        count: tutorials.len(),
        tutorials: tutorials.into_iter().map(TutorialResponse::from).collect(),
    }))
}

/// GET /tutorials/:id
pub async fn get_tutorial(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<TutorialResponse>, ApiError> {
    let tutorial = TutorialService::get(&state, &id).await?;
    Ok(Json(TutorialResponse::from(tutorial)))
}

/// DELETE /tutorials/:id - removes the record, its media and caption tracks
pub async fn delete_tutorial(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let tutorial = TutorialService::delete(&state, &id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Tutorial '{}' deleted", tutorial.title),
    }))
}
