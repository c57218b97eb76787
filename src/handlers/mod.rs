// src/handlers/mod.rs
pub mod captions;
pub mod tutorials;
