// src/store/memory.rs
use super::{AttemptResolution, CaptionOutcome, TutorialStore};
use crate::error::StoreError;
use crate::models::tutorial::{CaptionsStatus, Tutorial};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local tutorial store. Used when no DATABASE_URL is configured and by tests.
#[derive(Default)]
pub struct MemoryTutorialStore {
    tutorials: RwLock<HashMap<String, Tutorial>>,
}

impl MemoryTutorialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TutorialStore for MemoryTutorialStore {
    async fn insert(&self, tutorial: &Tutorial) -> Result<(), StoreError> {
        let mut tutorials = self.tutorials.write().await;
        if tutorials.contains_key(&tutorial.id) {
            return Err(StoreError::Duplicate(tutorial.id.clone()));
        }
        tutorials.insert(tutorial.id.clone(), tutorial.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Tutorial>, StoreError> {
        let tutorials = self.tutorials.read().await;
        Ok(tutorials.get(id).cloned())
    }

    async fn list(&self, course: Option<&str>) -> Result<Vec<Tutorial>, StoreError> {
        let tutorials = self.tutorials.read().await;
        let mut matching: Vec<Tutorial> = tutorials
            .values()
            .filter(|t| course.map_or(true, |c| t.course == c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn begin_caption_attempt(&self, id: &str) -> Result<Option<i64>, StoreError> {
        let mut tutorials = self.tutorials.write().await;
        let Some(tutorial) = tutorials.get_mut(id) else {
            return Ok(None);
        };

        tutorial.caption_attempt += 1;
        tutorial.captions_status = CaptionsStatus::Generating;
        tutorial.captions_url = None;
        tutorial.updated_at = Utc::now();
        Ok(Some(tutorial.caption_attempt))
    }

    async fn finish_caption_attempt(
        &self,
        id: &str,
        attempt: i64,
        outcome: &CaptionOutcome,
    ) -> Result<AttemptResolution, StoreError> {
        let mut tutorials = self.tutorials.write().await;
        let Some(tutorial) = tutorials.get_mut(id) else {
            return Ok(AttemptResolution::Missing);
        };
        if tutorial.caption_attempt != attempt {
            return Ok(AttemptResolution::Superseded);
        }

        match outcome {
            CaptionOutcome::Completed { captions_url } => {
                tutorial.captions_status = CaptionsStatus::Completed;
                tutorial.captions_url = Some(captions_url.clone());
            }
            CaptionOutcome::Failed => {
                tutorial.captions_status = CaptionsStatus::Failed;
                tutorial.captions_url = None;
            }
        }
        tutorial.updated_at = Utc::now();
        Ok(AttemptResolution::Applied)
    }

    async fn delete(&self, id: &str) -> Result<Option<Tutorial>, StoreError> {
        let mut tutorials = self.tutorials.write().await;
        Ok(tutorials.remove(id))
    }
}
