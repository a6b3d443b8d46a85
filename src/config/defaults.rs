pub(crate) fn default_api_base_url() -> String {
    "https://api.mangadex.org".to_string()
}

pub(crate) fn default_cover_base_url() -> String {
    "https://uploads.mangadex.org/covers".to_string()
}

pub(crate) fn default_translated_language() -> String {
    "en".to_string()
}

pub(crate) fn default_content_ratings() -> Vec<String> {
    vec!["safe".to_string(), "suggestive".to_string()]
}

pub(crate) fn default_feed_page_size() -> usize {
    100
}

pub(crate) fn default_search_limit() -> usize {
    10
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_data_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_key_page_left() -> String {
    "arrowleft".to_string()
}

pub(crate) fn default_key_page_right() -> String {
    "arrowright".to_string()
}

pub(crate) fn default_key_quit() -> String {
    "escape".to_string()
}

pub(crate) fn default_key_toggle_layout() -> String {
    "d".to_string()
}

pub(crate) fn default_key_toggle_direction() -> String {
    "r".to_string()
}
