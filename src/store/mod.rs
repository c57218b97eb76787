// src/store/mod.rs
//! Tutorial persistence behind a trait so the captioning workflow can run against
//! PostgreSQL in production and an in-memory map in tests or database-less setups.

use crate::error::StoreError;
use crate::models::tutorial::Tutorial;
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::MemoryTutorialStore;
pub use postgres::PgTutorialStore;

/// Terminal result of one caption generation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionOutcome {
    Completed { captions_url: String },
    Failed,
}

/// What happened when an attempt tried to write its outcome back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResolution {
    /// Token matched, the record now reflects the outcome
    Applied,
    /// A newer attempt was started; the outcome was discarded
    Superseded,
    /// The tutorial no longer exists
    Missing,
}

#[async_trait]
pub trait TutorialStore: Send + Sync {
    async fn insert(&self, tutorial: &Tutorial) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Tutorial>, StoreError>;

    /// Newest first, optionally restricted to one course
    async fn list(&self, course: Option<&str>) -> Result<Vec<Tutorial>, StoreError>;

    /// Move the tutorial into `generating`, clear its caption URL and bump the attempt
    /// token. Returns the new token, or `None` if the tutorial does not exist.
    async fn begin_caption_attempt(&self, id: &str) -> Result<Option<i64>, StoreError>;

    /// Apply an outcome only if `attempt` is still the tutorial's latest attempt.
    async fn finish_caption_attempt(
        &self,
        id: &str,
        attempt: i64,
        outcome: &CaptionOutcome,
    ) -> Result<AttemptResolution, StoreError>;

    /// Remove the record, returning it if it existed
    async fn delete(&self, id: &str) -> Result<Option<Tutorial>, StoreError>;
}
