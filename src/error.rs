// src/error.rs
use crate::models::tutorial::MessageResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Corrupt tutorial record {id}: {message}")]
    CorruptRecord { id: String, message: String },
    #[error("Tutorial {0} already exists")]
    Duplicate(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn tutorial_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Tutorial {} not found", id))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            // Internal details stay in the logs
            let error_id = Uuid::new_v4();
            tracing::error!(error_id = %error_id, error = %self, "request failed");
            format!("Internal server error (ID: {})", error_id)
        } else {
            self.to_string()
        };

        (
            status,
            Json(MessageResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
