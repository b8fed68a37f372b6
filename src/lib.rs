//! Song video sync library - shared modules for all binaries.

pub mod config;
pub mod ini;
pub mod metadata;
pub mod models;
pub mod progress;
pub mod safety;
pub mod sync;
pub mod video;
pub mod walker;
