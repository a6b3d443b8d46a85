use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("failed to parse config TOML")?;
    Ok(tables.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use crate::models::{PageLayout, ReadingDirection};

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").expect("empty config should parse");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let cfg = parse_config(
            r#"
            [reader]
            page_layout = "double"
            direction = "rtl"

            [logging]
            log_level = "debug"

            [keys]
            quit = "q"
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.page_layout, PageLayout::Double);
        assert_eq!(cfg.direction, ReadingDirection::Rtl);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.keys.quit, "q");
        assert_eq!(cfg.keys.page_right, "arrowright");
        assert_eq!(cfg.api_base_url, "https://api.mangadex.org");
    }

    #[test]
    fn api_values_are_sanitized() {
        let cfg = parse_config(
            r#"
            [api]
            base_url = "http://127.0.0.1:5000/"
            feed_page_size = 0
            search_limit = 1000
            request_timeout_secs = 0
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.api_base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.feed_page_size, 1);
        assert_eq!(cfg.search_limit, 100);
        assert_eq!(cfg.request_timeout_secs, 1);
    }

    #[test]
    fn invalid_toml_is_an_error_and_load_falls_back() {
        assert!(parse_config("[reader\npage_layout = ").is_err());

        let path = std::env::temp_dir().join(format!(
            "manga_theater_bad_config_{}.toml",
            crate::models::now_unix_millis()
        ));
        fs::write(&path, "not = [valid").expect("temp config should be writable");
        let cfg = load_config(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn cloud_target_requires_enabled_endpoint_and_user() {
        let mut cfg = AppConfig::default();
        assert!(cfg.cloud_sync.target().is_none());
        cfg.cloud_sync.enabled = true;
        cfg.cloud_sync.endpoint = Some("https://sync.example".to_string());
        assert!(cfg.cloud_sync.target().is_none());
        cfg.cloud_sync.user_id = Some("u1".to_string());
        assert_eq!(
            cfg.cloud_sync.target(),
            Some(("https://sync.example", "u1"))
        );
    }
}
