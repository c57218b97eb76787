// lib.rs - tutorial upload and caption generation service
pub mod captions;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;

use axum::{response::Json, routing::get, Extension, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Shared state handed to every handler through an `Extension`
pub struct AppState {
    pub store: Arc<dyn store::TutorialStore>,
    pub media: storage::MediaStorage,
    pub caption_queue: jobs::CaptionQueue,
}

pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let uploads = ServeDir::new(state.media.root());

    Router::new()
        .merge(handlers::tutorials::tutorial_routes(max_upload_bytes))
        .merge(handlers::captions::caption_routes())
        .route("/api/status", get(api_status))
        .nest_service(storage::PUBLIC_PREFIX, uploads)
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

async fn api_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
