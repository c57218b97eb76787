// src/store/postgres.rs
use super::{AttemptResolution, CaptionOutcome, TutorialStore};
use crate::error::StoreError;
use crate::models::tutorial::{CaptionsStatus, Tutorial};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};

const TUTORIAL_COLUMNS: &str = "id, title, course, description, tutorial_type, media_path, file_path, \
     file_size, mime_type, captions_status, captions_url, caption_attempt, created_at, updated_at";

#[derive(Debug, FromRow)]
struct TutorialRow {
    id: String,
    title: String,
    course: String,
    description: Option<String>,
    tutorial_type: String,
    media_path: String,
    file_path: String,
    file_size: i64,
    mime_type: Option<String>,
    captions_status: String,
    captions_url: Option<String>,
    caption_attempt: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TutorialRow> for Tutorial {
    type Error = StoreError;

    fn try_from(row: TutorialRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| StoreError::CorruptRecord {
            id: row.id.clone(),
            message,
        };
        let tutorial_type = row.tutorial_type.parse().map_err(corrupt)?;
        let captions_status = row.captions_status.parse().map_err(corrupt)?;

        Ok(Tutorial {
            id: row.id,
            title: row.title,
            course: row.course,
            description: row.description,
            tutorial_type,
            media_path: row.media_path,
            file_path: row.file_path,
            file_size: row.file_size,
            mime_type: row.mime_type,
            captions_status,
            captions_url: row.captions_url,
            caption_attempt: row.caption_attempt,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgTutorialStore {
    pool: PgPool,
}

impl PgTutorialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TutorialStore for PgTutorialStore {
    async fn insert(&self, tutorial: &Tutorial) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tutorials (
                id, title, course, description, tutorial_type, media_path, file_path,
                file_size, mime_type, captions_status, captions_url, caption_attempt,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&tutorial.id)
        .bind(&tutorial.title)
        .bind(&tutorial.course)
        .bind(&tutorial.description)
        .bind(tutorial.tutorial_type.as_str())
        .bind(&tutorial.media_path)
        .bind(&tutorial.file_path)
        .bind(tutorial.file_size)
        .bind(&tutorial.mime_type)
        .bind(tutorial.captions_status.as_str())
        .bind(&tutorial.captions_url)
        .bind(tutorial.caption_attempt)
        .bind(tutorial.created_at)
        .bind(tutorial.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(tutorial.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Tutorial>, StoreError> {
        let row = sqlx::query_as::<_, TutorialRow>(&format!(
            "SELECT {} FROM tutorials WHERE id = $1",
            TUTORIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tutorial::try_from).transpose()
    }

    async fn list(&self, course: Option<&str>) -> Result<Vec<Tutorial>, StoreError> {
        let rows = sqlx::query_as::<_, TutorialRow>(&format!(
            "SELECT {} FROM tutorials WHERE ($1::TEXT IS NULL OR course = $1) ORDER BY created_at DESC",
            TUTORIAL_COLUMNS
        ))
        .bind(course)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Tutorial::try_from).collect()
    }

    async fn begin_caption_attempt(&self, id: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE tutorials
            SET captions_status = $2,
                captions_url = NULL,
                caption_attempt = caption_attempt + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING caption_attempt
            "#,
        )
        .bind(id)
        .bind(CaptionsStatus::Generating.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i64, _>("caption_attempt")))
    }

    async fn finish_caption_attempt(
        &self,
        id: &str,
        attempt: i64,
        outcome: &CaptionOutcome,
    ) -> Result<AttemptResolution, StoreError> {
        let (status, captions_url) = match outcome {
            CaptionOutcome::Completed { captions_url } => {
                (CaptionsStatus::Completed, Some(captions_url.as_str()))
            }
            CaptionOutcome::Failed => (CaptionsStatus::Failed, None),
        };

        let updated = sqlx::query(
            r#"
            UPDATE tutorials
            SET captions_status = $3, captions_url = $4, updated_at = NOW()
            WHERE id = $1 AND caption_attempt = $2
            "#,
        )
        .bind(id)
        .bind(attempt)
        .bind(status.as_str())
        .bind(captions_url)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(AttemptResolution::Applied);
        }

        let exists = sqlx::query("SELECT 1 FROM tutorials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        Ok(if exists {
            AttemptResolution::Superseded
        } else {
            AttemptResolution::Missing
        })
    }

    async fn delete(&self, id: &str) -> Result<Option<Tutorial>, StoreError> {
        let row = sqlx::query_as::<_, TutorialRow>(&format!(
            "DELETE FROM tutorials WHERE id = $1 RETURNING {}",
            TUTORIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tutorial::try_from).transpose()
    }
}
