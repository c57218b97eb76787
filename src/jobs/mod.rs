// src/jobs/mod.rs
//! Background caption generation.
//! Handlers push a `CaptionJob` onto the queue and return; a single worker drains the
//! queue, runs each job on its own task and writes the outcome back through
//! `apply_outcome`. Every outcome is also broadcast as a `CaptionEvent`.
//!
//! Each attempt writes to its own staged file. Only an attempt whose outcome is applied
//! moves it onto the published track; every other staged file is removed.

use crate::captions::{
    caption_track_path, staged_track_path, CaptionError, CaptionGenerator, CAPTION_TRACK_EXTENSION,
};
use crate::store::{AttemptResolution, CaptionOutcome, TutorialStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};

const EVENT_CAPACITY: usize = 256;

/// One generation attempt for one tutorial
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionJob {
    pub tutorial_id: String,
    pub attempt: i64,
    /// Video on disk handed to the generator
    pub file_path: PathBuf,
    /// Public media path the caption URL is derived from
    pub media_path: String,
}

impl CaptionJob {
    pub fn staged_track_path(&self) -> PathBuf {
        staged_track_path(&self.file_path, self.attempt)
    }

    /// Published track next to the video
    pub fn track_path(&self) -> PathBuf {
        self.file_path.with_extension(CAPTION_TRACK_EXTENSION)
    }
}

/// Result of a finished attempt, as seen by observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptionEvent {
    Completed {
        tutorial_id: String,
        attempt: i64,
        captions_url: String,
    },
    Failed {
        tutorial_id: String,
        attempt: i64,
        error: String,
    },
    /// A newer attempt was started before this one finished
    Superseded { tutorial_id: String, attempt: i64 },
    /// The tutorial was deleted while this attempt was running
    Orphaned { tutorial_id: String, attempt: i64 },
    /// The outcome could not be written to the store
    Unrecorded {
        tutorial_id: String,
        attempt: i64,
        error: String,
    },
}

impl CaptionEvent {
    pub fn tutorial_id(&self) -> &str {
        match self {
            CaptionEvent::Completed { tutorial_id, .. }
            | CaptionEvent::Failed { tutorial_id, .. }
            | CaptionEvent::Superseded { tutorial_id, .. }
            | CaptionEvent::Orphaned { tutorial_id, .. }
            | CaptionEvent::Unrecorded { tutorial_id, .. } => tutorial_id,
        }
    }

    pub fn attempt(&self) -> i64 {
        match self {
            CaptionEvent::Completed { attempt, .. }
            | CaptionEvent::Failed { attempt, .. }
            | CaptionEvent::Superseded { attempt, .. }
            | CaptionEvent::Orphaned { attempt, .. }
            | CaptionEvent::Unrecorded { attempt, .. } => *attempt,
        }
    }
}

/// Sending half, held in `AppState`
#[derive(Clone)]
pub struct CaptionQueue {
    sender: mpsc::UnboundedSender<CaptionJob>,
    events: broadcast::Sender<CaptionEvent>,
    tracks: Arc<Mutex<()>>,
}

impl CaptionQueue {
    /// Hand a job to the worker. Gives the job back if the worker is gone.
    pub fn enqueue(&self, job: CaptionJob) -> Result<(), CaptionJob> {
        tracing::info!(
            tutorial_id = %job.tutorial_id,
            attempt = job.attempt,
            "🎬 Queued caption generation"
        );
        self.sender.send(job).map_err(|e| e.0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptionEvent> {
        self.events.subscribe()
    }

    /// Held while an outcome is applied and while a tutorial is deleted, so publishing a
    /// track never interleaves with the record check it depends on.
    pub async fn lock_tracks(&self) -> MutexGuard<'_, ()> {
        self.tracks.lock().await
    }
}

pub struct CaptionWorker {
    receiver: mpsc::UnboundedReceiver<CaptionJob>,
    generator: Arc<dyn CaptionGenerator>,
    store: Arc<dyn TutorialStore>,
    events: broadcast::Sender<CaptionEvent>,
    tracks: Arc<Mutex<()>>,
    timeout: Duration,
}

/// Create a connected queue/worker pair. Spawn `worker.run()` on the runtime.
pub fn caption_queue(
    generator: Arc<dyn CaptionGenerator>,
    store: Arc<dyn TutorialStore>,
    timeout: Duration,
) -> (CaptionQueue, CaptionWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let tracks = Arc::new(Mutex::new(()));

    let queue = CaptionQueue {
        sender,
        events: events.clone(),
        tracks: tracks.clone(),
    };
    let worker = CaptionWorker {
        receiver,
        generator,
        store,
        events,
        tracks,
        timeout,
    };
    (queue, worker)
}

impl CaptionWorker {
    /// Runs until every `CaptionQueue` clone has been dropped
    pub async fn run(mut self) {
        tracing::info!("🎬 Caption worker started (timeout {:?})", self.timeout);

        while let Some(job) = self.receiver.recv().await {
            let generator = self.generator.clone();
            let store = self.store.clone();
            let events = self.events.clone();
            let tracks = self.tracks.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                let event = run_job(&job, generator.as_ref(), store.as_ref(), &tracks, timeout).await;
                // Nobody listening is fine
                let _ = events.send(event);
            });
        }

        tracing::info!("Caption worker stopped");
    }
}

async fn run_job(
    job: &CaptionJob,
    generator: &dyn CaptionGenerator,
    store: &dyn TutorialStore,
    tracks: &Mutex<()>,
    timeout: Duration,
) -> CaptionEvent {
    tracing::info!(
        tutorial_id = %job.tutorial_id,
        attempt = job.attempt,
        file = %job.file_path.display(),
        "Generating captions"
    );

    let staged = job.staged_track_path();
    let result = match tokio::time::timeout(timeout, generator.generate(&job.file_path, &staged)).await {
        Ok(result) => result,
        Err(_) => Err(CaptionError::Timeout(timeout)),
    };

    let _tracks = tracks.lock().await;
    apply_outcome(store, job, result).await
}

/// The single place a generation result is written back to the tutorial record.
/// Callers hold the queue's track lock.
pub async fn apply_outcome(
    store: &dyn TutorialStore,
    job: &CaptionJob,
    result: Result<(), CaptionError>,
) -> CaptionEvent {
    let tutorial_id = job.tutorial_id.clone();
    let attempt = job.attempt;
    let staged = job.staged_track_path();

    let (outcome, error) = match result {
        Ok(()) => (
            CaptionOutcome::Completed {
                captions_url: caption_track_path(&job.media_path),
            },
            None,
        ),
        Err(e) => {
            tracing::warn!(tutorial_id = %tutorial_id, attempt, error = %e, "Caption generation failed");
            (CaptionOutcome::Failed, Some(e.to_string()))
        }
    };

    let event = match store.finish_caption_attempt(&tutorial_id, attempt, &outcome).await {
        Ok(AttemptResolution::Applied) => match outcome {
            CaptionOutcome::Completed { captions_url } => {
                match tokio::fs::rename(&staged, job.track_path()).await {
                    Ok(()) => {
                        tracing::info!(tutorial_id = %tutorial_id, attempt, captions_url = %captions_url, "✅ Captions completed");
                        CaptionEvent::Completed {
                            tutorial_id,
                            attempt,
                            captions_url,
                        }
                    }
                    Err(e) => publish_failed(store, job, e).await,
                }
            }
            CaptionOutcome::Failed => CaptionEvent::Failed {
                tutorial_id,
                attempt,
                error: error.unwrap_or_default(),
            },
        },
        Ok(AttemptResolution::Superseded) => {
            tracing::info!(tutorial_id = %tutorial_id, attempt, "Discarding result of superseded caption attempt");
            CaptionEvent::Superseded {
                tutorial_id,
                attempt,
            }
        }
        Ok(AttemptResolution::Missing) => {
            tracing::info!(tutorial_id = %tutorial_id, attempt, "Tutorial deleted during caption generation");
            CaptionEvent::Orphaned {
                tutorial_id,
                attempt,
            }
        }
        Err(e) => {
            tracing::error!(tutorial_id = %tutorial_id, attempt, error = %e, "Failed to record caption outcome");
            CaptionEvent::Unrecorded {
                tutorial_id,
                attempt,
                error: e.to_string(),
            }
        }
    };

    // Anything not published by now is discarded
    remove_staged_track(&staged).await;
    event
}

/// The record says `completed` but the track could not be moved into place
async fn publish_failed(store: &dyn TutorialStore, job: &CaptionJob, e: std::io::Error) -> CaptionEvent {
    tracing::error!(tutorial_id = %job.tutorial_id, attempt = job.attempt, "Failed to publish caption track: {}", e);

    // Same attempt token, so this still applies
    if let Err(store_err) = store
        .finish_caption_attempt(&job.tutorial_id, job.attempt, &CaptionOutcome::Failed)
        .await
    {
        tracing::error!(tutorial_id = %job.tutorial_id, "Failed to record caption failure: {}", store_err);
    }

    CaptionEvent::Failed {
        tutorial_id: job.tutorial_id.clone(),
        attempt: job.attempt,
        error: format!("Failed to publish caption track: {}", e),
    }
}

async fn remove_staged_track(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staged caption track {}: {}", staged.display(), e);
        }
    }
}
