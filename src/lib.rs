//! Manga reader core: content provider, chapter sequencing, page layout,
//! navigation and reading-progress persistence.

pub mod cache;
pub mod cloud_sync;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod provider;
pub mod reader;
