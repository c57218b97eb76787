// src/services/mod.rs
pub mod caption_workflow;
pub mod tutorial_service;

pub use caption_workflow::CaptionWorkflow;
pub use tutorial_service::{TutorialService, TutorialUpload};
