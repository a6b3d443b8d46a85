use super::ContentProvider;
use super::types::{
    AtHomeResponse, ChapterData, CollectionResponse, EntityResponse, LocalizedString, MangaData,
};
use crate::config::AppConfig;
use crate::error::ReaderError;
use crate::models::{Chapter, Manga, MangaStatus, parse_chapter_number};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_DISPLAY_TAGS: usize = 5;
/// The feed endpoint refuses `offset + limit` beyond this window.
const MAX_FEED_WINDOW: usize = 10_000;
const USER_AGENT: &str = concat!("manga-theater/", env!("CARGO_PKG_VERSION"));
const NO_DESCRIPTION: &str = "No description available.";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Blocking client for a MangaDex-compatible REST API.
pub struct MangaDexClient {
    http: Client,
    base_url: String,
    cover_base_url: String,
    translated_language: String,
    content_ratings: Vec<String>,
    feed_page_size: usize,
    use_data_saver: bool,
}

impl MangaDexClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            cover_base_url: config.cover_base_url.clone(),
            translated_language: config.translated_language.clone(),
            content_ratings: config.content_ratings.clone(),
            feed_page_size: config.feed_page_size,
            use_data_saver: config.use_data_saver,
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ReaderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "MangaDex request");
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .map_err(|err| ReaderError::unavailable(resource, err))?;
        let status = response.status();
        if status.as_u16() == 429 {
            warn!(%url, "MangaDex rate limit hit");
            return Err(ReaderError::unavailable(
                resource,
                "rate limit hit, please wait",
            ));
        }
        if !status.is_success() {
            return Err(ReaderError::unavailable(
                resource,
                format!("HTTP {}", status),
            ));
        }
        let body = response
            .text()
            .map_err(|err| ReaderError::unavailable(resource, err))?;
        serde_json::from_str(&body).map_err(|err| {
            ReaderError::unavailable(resource, format!("unexpected payload: {err}"))
        })
    }
}

impl ContentProvider for MangaDexClient {
    fn search_manga(&self, title: &str, limit: usize) -> Result<Vec<Manga>, ReaderError> {
        let mut params = vec![
            ("limit", limit.to_string()),
            ("order[followedCount]", "desc".to_string()),
            ("order[rating]", "desc".to_string()),
            ("includes[]", "cover_art".to_string()),
            ("includes[]", "author".to_string()),
        ];
        for rating in &self.content_ratings {
            params.push(("contentRating[]", rating.clone()));
        }
        let title = title.trim();
        if !title.is_empty() {
            params.push(("title", title.to_string()));
        }

        let response: CollectionResponse<MangaData> =
            self.get_json("manga search results", "/manga", &params)?;
        info!(query = title, results = response.data.len(), "Search complete");
        Ok(response
            .data
            .iter()
            .map(|manga| normalize_manga(manga, &self.cover_base_url))
            .collect())
    }

    fn get_manga(&self, manga_id: &str) -> Result<Manga, ReaderError> {
        let params = [
            ("includes[]", "cover_art".to_string()),
            ("includes[]", "author".to_string()),
        ];
        let response: EntityResponse<MangaData> =
            self.get_json("manga details", &format!("/manga/{manga_id}"), &params)?;
        Ok(normalize_manga(&response.data, &self.cover_base_url))
    }

    fn get_chapters_for_manga(&self, manga_id: &str) -> Result<Vec<Chapter>, ReaderError> {
        let path = format!("/manga/{manga_id}/feed");
        let mut chapters = Vec::new();
        let mut offset = 0usize;
        loop {
            let params = [
                ("translatedLanguage[]", self.translated_language.clone()),
                ("order[chapter]", "asc".to_string()),
                ("limit", self.feed_page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: CollectionResponse<ChapterData> =
                self.get_json("chapter feed", &path, &params)?;
            let received = page.data.len();
            chapters.extend(page.data.iter().map(|data| normalize_chapter(manga_id, data)));
            offset = page.offset + received;
            if received == 0 || offset >= page.total {
                break;
            }
            if offset + self.feed_page_size > MAX_FEED_WINDOW {
                warn!(
                    manga = manga_id,
                    total = page.total,
                    "Chapter feed truncated at the API paging window"
                );
                break;
            }
        }
        debug!(manga = manga_id, chapters = chapters.len(), "Fetched chapter feed");
        Ok(chapters)
    }

    fn get_page_urls(&self, chapter_id: &str) -> Result<Vec<String>, ReaderError> {
        let response: AtHomeResponse = self.get_json(
            "chapter pages",
            &format!("/at-home/server/{chapter_id}"),
            &[],
        )?;
        Ok(page_urls_from_at_home(&response, self.use_data_saver))
    }
}

/// Flatten a MangaDex manga entity into the reader's `Manga`.
pub(crate) fn normalize_manga(manga: &MangaData, cover_base_url: &str) -> Manga {
    let attributes = &manga.attributes;
    let cover_file = manga
        .relationships
        .iter()
        .find(|rel| rel.kind == "cover_art")
        .and_then(|rel| rel.attributes.as_ref())
        .and_then(|attrs| attrs.file_name.clone());
    let author = manga
        .relationships
        .iter()
        .find(|rel| rel.kind == "author")
        .and_then(|rel| rel.attributes.as_ref())
        .and_then(|attrs| attrs.name.clone())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    Manga {
        id: manga.id.clone(),
        title: localized(&attributes.title).unwrap_or_else(|| manga.id.clone()),
        description: attributes
            .description
            .as_ref()
            .and_then(|map| map.get("en").cloned())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        status: MangaStatus::from_api(attributes.status.as_deref()),
        content_rating: attributes
            .content_rating
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        tags: attributes
            .tags
            .iter()
            .filter_map(|tag| tag.attributes.name.get("en").cloned())
            .take(MAX_DISPLAY_TAGS)
            .collect(),
        cover_image: cover_file.map(|file| format!("{cover_base_url}/{}/{file}", manga.id)),
        author,
    }
}

pub(crate) fn normalize_chapter(manga_id: &str, chapter: &ChapterData) -> Chapter {
    let attributes = &chapter.attributes;
    Chapter {
        id: chapter.id.clone(),
        manga_id: manga_id.to_string(),
        number: parse_chapter_number(attributes.chapter.as_deref()),
        title: attributes
            .title
            .clone()
            .filter(|title| !title.trim().is_empty()),
        page_count: attributes.pages,
        externally_hosted: attributes
            .external_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty()),
    }
}

pub(crate) fn page_urls_from_at_home(response: &AtHomeResponse, use_data_saver: bool) -> Vec<String> {
    let base = response.base_url.trim_end_matches('/');
    let hash = &response.chapter.hash;
    let (segment, files) = if use_data_saver && !response.chapter.data_saver.is_empty() {
        ("data-saver", &response.chapter.data_saver)
    } else {
        ("data", &response.chapter.data)
    };
    files
        .iter()
        .map(|file| format!("{base}/{segment}/{hash}/{file}"))
        .collect()
}

/// English title, else the first available localization.
fn localized(map: &LocalizedString) -> Option<String> {
    map.get("en")
        .or_else(|| map.values().next())
        .filter(|s| !s.trim().is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COVERS: &str = "https://uploads.example/covers";

    fn manga_fixture() -> MangaData {
        serde_json::from_value(json!({
            "id": "m-1",
            "type": "manga",
            "attributes": {
                "title": { "ja-ro": "Sono Bisque Doll" },
                "description": { "en": "A story about cosplay." },
                "status": "ongoing",
                "contentRating": "suggestive",
                "tags": [
                    { "attributes": { "name": { "en": "Romance" } } },
                    { "attributes": { "name": { "en": "Comedy" } } },
                    { "attributes": { "name": { "en": "School Life" } } },
                    { "attributes": { "name": { "en": "Slice of Life" } } },
                    { "attributes": { "name": { "en": "Drama" } } },
                    { "attributes": { "name": { "en": "Sixth" } } }
                ]
            },
            "relationships": [
                { "id": "a-1", "type": "author", "attributes": { "name": "Fukuda Shinichi" } },
                { "id": "cv-1", "type": "cover_art", "attributes": { "fileName": "cover.jpg" } }
            ]
        }))
        .expect("manga fixture should deserialize")
    }

    #[test]
    fn normalizes_manga_payload() {
        let manga = normalize_manga(&manga_fixture(), COVERS);

        assert_eq!(manga.id, "m-1");
        assert_eq!(manga.title, "Sono Bisque Doll");
        assert_eq!(manga.description, "A story about cosplay.");
        assert_eq!(manga.status, MangaStatus::Ongoing);
        assert_eq!(manga.content_rating, "suggestive");
        assert_eq!(manga.tags.len(), 5);
        assert!(!manga.tags.contains(&"Sixth".to_string()));
        assert_eq!(
            manga.cover_image.as_deref(),
            Some("https://uploads.example/covers/m-1/cover.jpg")
        );
        assert_eq!(manga.author, "Fukuda Shinichi");
    }

    #[test]
    fn missing_optional_manga_fields_use_fallbacks() {
        let data: MangaData = serde_json::from_value(json!({
            "id": "m-2",
            "attributes": { "title": { "en": "Plain" }, "description": {} }
        }))
        .unwrap();

        let manga = normalize_manga(&data, COVERS);
        assert_eq!(manga.title, "Plain");
        assert_eq!(manga.description, NO_DESCRIPTION);
        assert_eq!(manga.author, UNKNOWN_AUTHOR);
        assert_eq!(manga.cover_image, None);
        assert_eq!(manga.status, MangaStatus::Unknown);
        assert!(manga.tags.is_empty());
    }

    #[test]
    fn normalizes_feed_entries() {
        let feed: CollectionResponse<ChapterData> = serde_json::from_value(json!({
            "result": "ok",
            "data": [
                { "id": "c-1", "attributes": { "chapter": "1", "title": "Start", "pages": 20, "externalUrl": null } },
                { "id": "c-2", "attributes": { "chapter": null, "title": "", "pages": 12 } },
                { "id": "c-3", "attributes": { "chapter": "2.5", "pages": 0, "externalUrl": "https://publisher.example/read" } }
            ],
            "limit": 100,
            "offset": 0,
            "total": 3
        }))
        .unwrap();

        let chapters: Vec<Chapter> = feed
            .data
            .iter()
            .map(|data| normalize_chapter("m-1", data))
            .collect();

        assert_eq!(chapters[0].number, Some(1.0));
        assert_eq!(chapters[0].title.as_deref(), Some("Start"));
        assert!(chapters[0].is_readable());
        assert_eq!(chapters[1].number, None);
        assert_eq!(chapters[1].title, None);
        assert_eq!(chapters[1].display_label(), "Oneshot");
        assert!(chapters[2].externally_hosted);
        assert!(!chapters[2].is_readable());
        assert!(chapters.iter().all(|c| c.manga_id == "m-1"));
        assert_eq!(feed.total, 3);
    }

    #[test]
    fn builds_page_urls_from_at_home_server() {
        let response: AtHomeResponse = serde_json::from_value(json!({
            "result": "ok",
            "baseUrl": "https://node.example/",
            "chapter": {
                "hash": "abc123",
                "data": ["1.png", "2.png"],
                "dataSaver": ["1.jpg", "2.jpg"]
            }
        }))
        .unwrap();

        assert_eq!(
            page_urls_from_at_home(&response, false),
            vec![
                "https://node.example/data/abc123/1.png",
                "https://node.example/data/abc123/2.png"
            ]
        );
        assert_eq!(
            page_urls_from_at_home(&response, true)[1],
            "https://node.example/data-saver/abc123/2.jpg"
        );
    }
}
