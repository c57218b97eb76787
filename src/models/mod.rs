// src/models/mod.rs
pub mod tutorial;
