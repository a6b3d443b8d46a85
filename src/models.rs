//! Domain records shared by the provider, the stores and the reader session.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Publication status as reported by the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MangaStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    #[default]
    Unknown,
}

impl MangaStatus {
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("ongoing") => MangaStatus::Ongoing,
            Some("completed") => MangaStatus::Completed,
            Some("hiatus") => MangaStatus::Hiatus,
            Some("cancelled") => MangaStatus::Cancelled,
            _ => MangaStatus::Unknown,
        }
    }
}

impl std::fmt::Display for MangaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MangaStatus::Ongoing => "Ongoing",
            MangaStatus::Completed => "Completed",
            MangaStatus::Hiatus => "On Hiatus",
            MangaStatus::Cancelled => "Cancelled",
            MangaStatus::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Normalized manga metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manga {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: MangaStatus,
    pub content_rating: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub author: String,
}

/// One entry of a manga's chapter feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub manga_id: String,
    /// Numeric chapter label; `None` for oneshots.
    pub number: Option<f64>,
    pub title: Option<String>,
    pub page_count: u32,
    pub externally_hosted: bool,
}

impl Chapter {
    /// Readable chapters have pages and are hosted by the provider itself.
    pub fn is_readable(&self) -> bool {
        self.page_count > 0 && !self.externally_hosted
    }

    pub fn sort_key(&self) -> f64 {
        self.number.unwrap_or(0.0)
    }

    pub fn display_label(&self) -> String {
        match self.number {
            Some(number) => format!("Chapter {}", format_chapter_number(number)),
            None => "Oneshot".to_string(),
        }
    }
}

fn format_chapter_number(number: f64) -> String {
    if number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

/// Parse a chapter label such as `"12"` or `"12.5"`.
pub fn parse_chapter_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Last place the reader was at for one manga.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingPosition {
    pub manga_id: String,
    pub chapter_id: String,
    pub page_index: usize,
    pub chapter_label: String,
    pub timestamp: u64,
    #[serde(default)]
    pub manga_title: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    #[default]
    Single,
    Double,
}

impl PageLayout {
    pub fn toggled(self) -> Self {
        match self {
            PageLayout::Single => PageLayout::Double,
            PageLayout::Double => PageLayout::Single,
        }
    }
}

impl std::fmt::Display for PageLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PageLayout::Single => "single",
            PageLayout::Double => "double",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingDirection {
    #[default]
    Ltr,
    Rtl,
}

impl ReadingDirection {
    pub fn toggled(self) -> Self {
        match self {
            ReadingDirection::Ltr => ReadingDirection::Rtl,
            ReadingDirection::Rtl => ReadingDirection::Ltr,
        }
    }
}

impl std::fmt::Display for ReadingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReadingDirection::Ltr => "ltr",
            ReadingDirection::Rtl => "rtl",
        };
        write!(f, "{}", label)
    }
}

/// Global page layout preference; not tied to any manga.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LayoutPreference {
    #[serde(default)]
    pub layout: PageLayout,
    #[serde(default)]
    pub direction: ReadingDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

impl From<&Manga> for Favorite {
    fn from(manga: &Manga) -> Self {
        Favorite {
            id: manga.id.clone(),
            title: manga.title.clone(),
            cover_image: manga.cover_image.clone(),
        }
    }
}

pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(number: Option<f64>, pages: u32, external: bool) -> Chapter {
        Chapter {
            id: "c".to_string(),
            manga_id: "m".to_string(),
            number,
            title: None,
            page_count: pages,
            externally_hosted: external,
        }
    }

    #[test]
    fn readable_requires_pages_and_local_hosting() {
        assert!(chapter(Some(1.0), 10, false).is_readable());
        assert!(!chapter(Some(1.0), 0, false).is_readable());
        assert!(!chapter(Some(1.0), 10, true).is_readable());
    }

    #[test]
    fn missing_label_is_oneshot_and_sorts_as_zero() {
        let oneshot = chapter(None, 3, false);
        assert_eq!(oneshot.display_label(), "Oneshot");
        assert_eq!(oneshot.sort_key(), 0.0);
        assert_eq!(chapter(Some(12.5), 3, false).display_label(), "Chapter 12.5");
        assert_eq!(chapter(Some(7.0), 3, false).display_label(), "Chapter 7");
    }

    #[test]
    fn parses_chapter_labels_leniently() {
        assert_eq!(parse_chapter_number(Some(" 4.5 ")), Some(4.5));
        assert_eq!(parse_chapter_number(Some("")), None);
        assert_eq!(parse_chapter_number(Some("extra")), None);
        assert_eq!(parse_chapter_number(None), None);
    }

    #[test]
    fn status_maps_unknown_values() {
        assert_eq!(MangaStatus::from_api(Some("hiatus")), MangaStatus::Hiatus);
        assert_eq!(MangaStatus::from_api(Some("weird")), MangaStatus::Unknown);
        assert_eq!(MangaStatus::from_api(None), MangaStatus::Unknown);
    }
}
