use super::defaults;
use super::models::{AppConfig, CloudSyncConfig, KeyBindings, LogLevel};
use crate::models::{PageLayout, ReadingDirection};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
pub(super) struct ConfigTables {
    #[serde(default)]
    api: ApiConfig,
    #[serde(default)]
    reader: ReaderConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    keys: KeyBindings,
    #[serde(default)]
    cloud_sync: CloudSyncConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            api_base_url: tables.api.base_url.trim_end_matches('/').to_string(),
            cover_base_url: tables.api.cover_base_url.trim_end_matches('/').to_string(),
            translated_language: tables.api.translated_language,
            content_ratings: tables.api.content_ratings,
            feed_page_size: tables.api.feed_page_size.clamp(1, 500),
            search_limit: tables.api.search_limit.clamp(1, 100),
            use_data_saver: tables.api.use_data_saver,
            request_timeout_secs: tables.api.request_timeout_secs.max(1),
            data_dir: tables.storage.data_dir,
            page_layout: tables.reader.page_layout,
            direction: tables.reader.direction,
            log_level: tables.logging.log_level,
            keys: tables.keys,
            cloud_sync: tables.cloud_sync,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiConfig {
    #[serde(default = "defaults::default_api_base_url")]
    base_url: String,
    #[serde(default = "defaults::default_cover_base_url")]
    cover_base_url: String,
    #[serde(default = "defaults::default_translated_language")]
    translated_language: String,
    #[serde(default = "defaults::default_content_ratings")]
    content_ratings: Vec<String>,
    #[serde(default = "defaults::default_feed_page_size")]
    feed_page_size: usize,
    #[serde(default = "defaults::default_search_limit")]
    search_limit: usize,
    #[serde(default)]
    use_data_saver: bool,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: defaults::default_api_base_url(),
            cover_base_url: defaults::default_cover_base_url(),
            translated_language: defaults::default_translated_language(),
            content_ratings: defaults::default_content_ratings(),
            feed_page_size: defaults::default_feed_page_size(),
            search_limit: defaults::default_search_limit(),
            use_data_saver: false,
            request_timeout_secs: defaults::default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ReaderConfig {
    #[serde(default)]
    page_layout: PageLayout,
    #[serde(default)]
    direction: ReadingDirection,
}

#[derive(Debug, Clone, Deserialize)]
struct StorageConfig {
    #[serde(default = "default_data_dir_path")]
    data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: default_data_dir_path(),
        }
    }
}

fn default_data_dir_path() -> PathBuf {
    PathBuf::from(defaults::default_data_dir())
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
