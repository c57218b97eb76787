use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorialType {
    Video,
    Pdf,
}

impl TutorialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TutorialType::Video => "video",
            TutorialType::Pdf => "pdf",
        }
    }

    /// File extensions accepted for uploads of this type
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        match self {
            TutorialType::Video => {
                matches!(extension.as_str(), "mp4" | "mov" | "webm" | "mkv" | "avi" | "m4v")
            }
            TutorialType::Pdf => extension == "pdf",
        }
    }

    pub fn media_subdir(&self) -> &'static str {
        match self {
            TutorialType::Video => "videos",
            TutorialType::Pdf => "pdfs",
        }
    }
}

impl fmt::Display for TutorialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TutorialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" => Ok(TutorialType::Video),
            "pdf" => Ok(TutorialType::Pdf),
            other => Err(format!("unknown tutorial type '{}'", other)),
        }
    }
}

/// Lifecycle of a tutorial's caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionsStatus {
    NotStarted,
    Generating,
    Completed,
    Failed,
}

impl CaptionsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionsStatus::NotStarted => "not_started",
            CaptionsStatus::Generating => "generating",
            CaptionsStatus::Completed => "completed",
            CaptionsStatus::Failed => "failed",
        }
    }

    pub fn initial_for(tutorial_type: TutorialType) -> Self {
        match tutorial_type {
            TutorialType::Video => CaptionsStatus::Generating,
            TutorialType::Pdf => CaptionsStatus::NotStarted,
        }
    }
}

impl fmt::Display for CaptionsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptionsStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(CaptionsStatus::NotStarted),
            "generating" => Ok(CaptionsStatus::Generating),
            "completed" => Ok(CaptionsStatus::Completed),
            "failed" => Ok(CaptionsStatus::Failed),
            other => Err(format!("unknown captions status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tutorial {
    pub id: String,
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    pub tutorial_type: TutorialType,
    /// Public path the file is served from, e.g. `/uploads/videos/<name>.mp4`
    pub media_path: String,
    /// Where the file lives on disk
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub captions_status: CaptionsStatus,
    pub captions_url: Option<String>,
    pub caption_attempt: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tutorial {
    pub fn is_video(&self) -> bool {
        self.tutorial_type == TutorialType::Video
    }

    /// Caption URL as readers may see it: only a completed track is surfaced
    pub fn visible_captions_url(&self) -> Option<String> {
        match self.captions_status {
            CaptionsStatus::Completed => self.captions_url.clone(),
            _ => None,
        }
    }
}

/// Input for creating a tutorial once its media has been stored
#[derive(Debug, Clone)]
pub struct NewTutorial {
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    pub tutorial_type: TutorialType,
    pub media_path: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
}

impl NewTutorial {
    pub fn into_tutorial(self, id: String) -> Tutorial {
        let now = Utc::now();
        let captions_status = CaptionsStatus::initial_for(self.tutorial_type);
        Tutorial {
            id,
            title: self.title,
            course: self.course,
            description: self.description,
            tutorial_type: self.tutorial_type,
            media_path: self.media_path,
            file_path: self.file_path,
            file_size: self.file_size,
            mime_type: self.mime_type,
            captions_status,
            // Entering `generating` at creation counts as the first attempt
            caption_attempt: if captions_status == CaptionsStatus::Generating { 1 } else { 0 },
            captions_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialResponse {
    pub id: String,
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub tutorial_type: TutorialType,
    pub media_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub captions_status: CaptionsStatus,
    pub captions_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions_generating: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tutorial> for TutorialResponse {
    fn from(tutorial: Tutorial) -> Self {
        let captions_url = tutorial.visible_captions_url();
        TutorialResponse {
            id: tutorial.id,
            title: tutorial.title,
            course: tutorial.course,
            description: tutorial.description,
            tutorial_type: tutorial.tutorial_type,
            media_path: tutorial.media_path,
            file_size: tutorial.file_size,
            mime_type: tutorial.mime_type,
            captions_status: tutorial.captions_status,
            captions_url,
            captions_generating: None,
            created_at: tutorial.created_at,
            updated_at: tutorial.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TutorialListResponse {
    pub success: bool,
    pub count: usize,
    pub tutorials: Vec<TutorialResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStatusResponse {
    pub status: CaptionsStatus,
    pub captions_url: Option<String>,
}

impl From<&Tutorial> for CaptionStatusResponse {
    fn from(tutorial: &Tutorial) -> Self {
        CaptionStatusResponse {
            status: tutorial.captions_status,
            captions_url: tutorial.visible_captions_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub message: String,
    pub status: CaptionsStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
