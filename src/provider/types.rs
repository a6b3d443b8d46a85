// MangaDex response shapes. Only the fields the reader consumes are modelled;
// everything else in the payload is ignored by serde.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Localized string map such as `{ "en": "...", "ja-ro": "..." }`.
pub(crate) type LocalizedString = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
pub(crate) struct EntityResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MangaData {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MangaAttributes {
    #[serde(default)]
    pub title: LocalizedString,
    #[serde(default)]
    pub description: Option<LocalizedString>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagData {
    pub attributes: TagAttributes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagAttributes {
    #[serde(default)]
    pub name: LocalizedString,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<RelationshipAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RelationshipAttributes {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterData {
    pub id: String,
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterAttributes {
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub external_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeResponse {
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}
