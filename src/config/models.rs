use crate::models::{LayoutPreference, PageLayout, ReadingDirection};
use serde::Deserialize;
use std::path::PathBuf;

/// High-level app configuration; built from the sectioned TOML tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub cover_base_url: String,
    pub translated_language: String,
    pub content_ratings: Vec<String>,
    pub feed_page_size: usize,
    pub search_limit: usize,
    pub use_data_saver: bool,
    pub request_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub page_layout: PageLayout,
    pub direction: ReadingDirection,
    pub log_level: LogLevel,
    pub keys: KeyBindings,
    pub cloud_sync: CloudSyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_base_url: crate::config::defaults::default_api_base_url(),
            cover_base_url: crate::config::defaults::default_cover_base_url(),
            translated_language: crate::config::defaults::default_translated_language(),
            content_ratings: crate::config::defaults::default_content_ratings(),
            feed_page_size: crate::config::defaults::default_feed_page_size(),
            search_limit: crate::config::defaults::default_search_limit(),
            use_data_saver: false,
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            data_dir: PathBuf::from(crate::config::defaults::default_data_dir()),
            page_layout: PageLayout::Single,
            direction: ReadingDirection::Ltr,
            log_level: crate::config::defaults::default_log_level(),
            keys: KeyBindings::default(),
            cloud_sync: CloudSyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layout used until the reader has saved a preference of its own.
    pub fn default_layout(&self) -> LayoutPreference {
        LayoutPreference {
            layout: self.page_layout,
            direction: self.direction,
        }
    }
}

/// Physical key names for reader input. Values are matched case-insensitively.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeyBindings {
    #[serde(default = "crate::config::defaults::default_key_page_left")]
    pub page_left: String,
    #[serde(default = "crate::config::defaults::default_key_page_right")]
    pub page_right: String,
    #[serde(default = "crate::config::defaults::default_key_quit")]
    pub quit: String,
    #[serde(default = "crate::config::defaults::default_key_toggle_layout")]
    pub toggle_layout: String,
    #[serde(default = "crate::config::defaults::default_key_toggle_direction")]
    pub toggle_direction: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            page_left: crate::config::defaults::default_key_page_left(),
            page_right: crate::config::defaults::default_key_page_right(),
            quit: crate::config::defaults::default_key_quit(),
            toggle_layout: crate::config::defaults::default_key_toggle_layout(),
            toggle_direction: crate::config::defaults::default_key_toggle_direction(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct CloudSyncConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl CloudSyncConfig {
    /// Endpoint and user id, when sync is switched on and fully configured.
    pub fn target(&self) -> Option<(&str, &str)> {
        if !self.enabled {
            return None;
        }
        let endpoint = self.endpoint.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let user_id = self.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((endpoint, user_id))
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
