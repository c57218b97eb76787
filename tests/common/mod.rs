//! Shared helpers for the HTTP integration tests: an app over the in-memory store and a
//! captioner whose outcomes and timing the test controls.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceExt;
use tutorial_captions::captions::{CaptionError, CaptionGenerator};
use tutorial_captions::jobs::{caption_queue, CaptionEvent};
use tutorial_captions::storage::MediaStorage;
use tutorial_captions::store::{MemoryTutorialStore, TutorialStore};
use tutorial_captions::{build_router, AppState};

pub const BOUNDARY: &str = "----tutorial-test-boundary";

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    Fail,
}

/// Pops one scripted outcome per call (succeeding once the script runs out). When gated,
/// call N waits until it is released, either in order with `release` or by number with
/// `release_call`. A successful call writes a track mentioning its call number.
pub struct ScriptedCaptioner {
    outcomes: Mutex<VecDeque<Script>>,
    gated: bool,
    gates: Mutex<Vec<Arc<Semaphore>>>,
    released: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedCaptioner {
    pub fn new(outcomes: Vec<Script>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            gated: false,
            gates: Mutex::new(Vec::new()),
            released: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn gated(outcomes: Vec<Script>) -> Self {
        Self {
            gated: true,
            ..Self::new(outcomes)
        }
    }

    fn gate(&self, call: usize) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().unwrap();
        while gates.len() < call {
            gates.push(Arc::new(Semaphore::new(0)));
        }
        gates[call - 1].clone()
    }

    /// Let the next `attempts` calls finish, in call order
    pub fn release(&self, attempts: usize) {
        for _ in 0..attempts {
            let call = self.released.fetch_add(1, Ordering::SeqCst) + 1;
            self.gate(call).add_permits(1);
        }
    }

    /// Let call number `call` (1-based) finish
    pub fn release_call(&self, call: usize) {
        self.gate(call).add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionGenerator for ScriptedCaptioner {
    async fn generate(&self, _video_path: &Path, output_path: &Path) -> Result<(), CaptionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let script = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Succeed);

        if self.gated {
            let gate = self.gate(call);
            gate.acquire().await.unwrap().forget();
        }

        match script {
            Script::Succeed => {
                let track = format!("WEBVTT\n\n00:00.000 --> 00:02.000\nCall {}\n", call);
                tokio::fs::write(output_path, track).await?;
                Ok(())
            }
            Script::Fail => Err(CaptionError::Service {
                status: 500,
                body: "mock captioning failure".to_string(),
            }),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub captioner: Arc<ScriptedCaptioner>,
    pub events: broadcast::Receiver<CaptionEvent>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new(captioner: ScriptedCaptioner) -> Self {
        Self::with_store(captioner, Arc::new(MemoryTutorialStore::new()))
    }

    pub fn with_store(captioner: ScriptedCaptioner, store: Arc<dyn TutorialStore>) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let captioner = Arc::new(captioner);

        let (queue, worker) = caption_queue(captioner.clone(), store.clone(), Duration::from_secs(30));
        tokio::spawn(worker.run());
        let events = queue.subscribe();

        let state = Arc::new(AppState {
            store,
            media: MediaStorage::new(upload_dir.path()),
            caption_queue: queue,
        });
        let router = build_router(state.clone(), 10 * 1024 * 1024);

        Self {
            router,
            state,
            captioner,
            events,
            upload_dir,
        }
    }

    pub async fn request(&self, method: Method, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.request(Method::GET, uri).await;
        (response.status(), body_json(response).await)
    }

    pub async fn post_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.request(Method::POST, uri).await;
        (response.status(), body_json(response).await)
    }

    pub async fn delete_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.request(Method::DELETE, uri).await;
        (response.status(), body_json(response).await)
    }

    pub async fn upload(&self, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tutorials")
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        (response.status(), body_json(response).await)
    }

    pub async fn upload_video(&self, title: &str) -> Value {
        let (status, body) = self
            .upload(
                &[("title", title), ("course", "CS101"), ("type", "video")],
                Some(("lecture.mp4", &b"not really a video"[..])),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
        body
    }

    /// Next event for `tutorial_id`, skipping events about other tutorials
    pub async fn next_event(&mut self, tutorial_id: &str) -> CaptionEvent {
        let wait = async {
            loop {
                let event = self.events.recv().await.unwrap();
                if event.tutorial_id() == tutorial_id {
                    return event;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for caption event")
    }

    /// Wait until the captioner has been called `calls` times
    pub async fn wait_for_calls(&self, calls: usize) {
        let wait = async {
            while self.captioner.calls() < calls {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for captioner calls");
    }

    /// Files in an upload subdirectory, sorted
    pub fn files_in(&self, subdir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir.path().join(subdir))
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Disk path for a public `/uploads/...` path
    pub fn disk_path(&self, public_path: &str) -> PathBuf {
        self.upload_dir
            .path()
            .join(public_path.trim_start_matches("/uploads/"))
    }
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
