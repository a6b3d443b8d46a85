//! Content provider seam: manga metadata, chapter feeds and page URLs.

mod mangadex;
mod types;

pub use mangadex::MangaDexClient;

use crate::error::ReaderError;
use crate::models::{Chapter, Manga};

pub trait ContentProvider: Send + Sync {
    fn search_manga(&self, title: &str, limit: usize) -> Result<Vec<Manga>, ReaderError>;

    fn get_manga(&self, manga_id: &str) -> Result<Manga, ReaderError>;

    /// Full chapter feed, unfiltered and in provider order.
    fn get_chapters_for_manga(&self, manga_id: &str) -> Result<Vec<Chapter>, ReaderError>;

    /// Ordered absolute image URLs. An empty list means the provider has
    /// nothing renderable for the chapter.
    fn get_page_urls(&self, chapter_id: &str) -> Result<Vec<String>, ReaderError>;
}
