//! On-disk user data: reading positions, layout preference and favorites.
//!
//! Positions live under `<data_dir>/progress/` using a hash of the manga id as
//! the directory name to avoid filesystem issues with opaque ids. Each entry is
//! a tiny TOML file. The layout preference and favorites list are single TOML
//! files at the root of the data directory.

use crate::models::{Favorite, LayoutPreference, ReadingPosition};
use crate::progress::{LayoutStore, ProgressStore, sorted_recent_first};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PROGRESS_DIR: &str = "progress";
const POSITION_FILE: &str = "position.toml";
const LAYOUT_FILE: &str = "layout.toml";
const FAVORITES_FILE: &str = "favorites.toml";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
struct FavoritesFile {
    #[serde(default)]
    favorites: Vec<Favorite>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hash_dir(&self, manga_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(manga_id.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(PROGRESS_DIR).join(hash)
    }

    fn position_path(&self, manga_id: &str) -> PathBuf {
        self.hash_dir(manga_id).join(POSITION_FILE)
    }

    /// Saved favorites; a missing or unreadable file reads as empty.
    pub fn load_favorites(&self) -> Vec<Favorite> {
        let path = self.root.join(FAVORITES_FILE);
        let Ok(data) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match toml::from_str::<FavoritesFile>(&data) {
            Ok(file) => file.favorites,
            Err(err) => {
                warn!(path = %path.display(), "Ignoring unreadable favorites file: {err}");
                Vec::new()
            }
        }
    }

    pub fn save_favorites(&self, favorites: &[Favorite]) -> Result<()> {
        let file = FavoritesFile {
            favorites: favorites.to_vec(),
        };
        write_toml(&self.root.join(FAVORITES_FILE), &file)
    }

    /// Add the manga to favorites, or remove it when already present.
    /// Returns whether it is a favorite afterwards.
    pub fn toggle_favorite(&self, favorite: Favorite) -> Result<bool> {
        let mut favorites = self.load_favorites();
        let now_favorite = if let Some(idx) = favorites.iter().position(|f| f.id == favorite.id) {
            favorites.remove(idx);
            false
        } else {
            favorites.push(favorite);
            true
        };
        self.save_favorites(&favorites)?;
        Ok(now_favorite)
    }

    /// Remove every reading position, the layout preference and favorites.
    pub fn clear_user_data(&self) -> Result<()> {
        let progress = self.root.join(PROGRESS_DIR);
        if progress.exists() {
            fs::remove_dir_all(&progress)
                .with_context(|| format!("failed to remove {}", progress.display()))?;
        }
        for name in [LAYOUT_FILE, FAVORITES_FILE] {
            let path = self.root.join(name);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        info!(root = %self.root.display(), "Cleared local user data");
        Ok(())
    }
}

impl ProgressStore for LocalStore {
    fn get(&self, manga_id: &str) -> Result<Option<ReadingPosition>> {
        let path = self.position_path(manga_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let position: ReadingPosition = toml::from_str(&data)
            .with_context(|| format!("invalid position file {}", path.display()))?;
        Ok(Some(position))
    }

    fn put(&self, position: &ReadingPosition) -> Result<()> {
        write_toml(&self.position_path(&position.manga_id), position)?;
        debug!(
            manga = %position.manga_id,
            chapter = %position.chapter_id,
            page = position.page_index,
            "Saved reading position"
        );
        Ok(())
    }

    fn all(&self) -> Result<Vec<ReadingPosition>> {
        let dir = self.root.join(PROGRESS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut positions = Vec::new();
        for entry in
            fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))?
        {
            let path = entry?.path().join(POSITION_FILE);
            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            match toml::from_str::<ReadingPosition>(&data) {
                Ok(position) => positions.push(position),
                Err(err) => warn!(path = %path.display(), "Skipping unreadable position: {err}"),
            }
        }
        Ok(sorted_recent_first(positions))
    }

    fn replace_all(&self, positions: &[ReadingPosition]) -> Result<()> {
        let dir = self.root.join(PROGRESS_DIR);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to reset {}", dir.display()))?;
        }
        for position in positions {
            self.put(position)?;
        }
        Ok(())
    }
}

impl LayoutStore for LocalStore {
    fn load_layout(&self) -> Result<Option<LayoutPreference>> {
        let path = self.root.join(LAYOUT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let preference = toml::from_str(&data)
            .with_context(|| format!("invalid layout file {}", path.display()))?;
        Ok(Some(preference))
    }

    fn save_layout(&self, preference: &LayoutPreference) -> Result<()> {
        write_toml(&self.root.join(LAYOUT_FILE), preference)
    }
}

fn write_toml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string(value).context("failed to serialize TOML")?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageLayout, ReadingDirection};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("manga_theater_{prefix}_{now}"))
    }

    fn position(manga_id: &str, chapter_id: &str, page_index: usize) -> ReadingPosition {
        ReadingPosition {
            manga_id: manga_id.to_string(),
            chapter_id: chapter_id.to_string(),
            page_index,
            chapter_label: "Chapter 2".to_string(),
            timestamp: 1_700_000_000_000,
            manga_title: Some("Test Manga".to_string()),
        }
    }

    #[test]
    fn positions_are_stored_per_manga_and_overwritten() {
        let root = unique_temp_dir("positions");
        let store = LocalStore::new(&root);

        assert!(store.get("m1").unwrap().is_none());
        store.put(&position("m1", "c1", 2)).unwrap();
        store.put(&position("m1", "c2", 5)).unwrap();
        store.put(&position("m2", "x1", 0)).unwrap();

        let saved = store.get("m1").unwrap().expect("m1 should be saved");
        assert_eq!(saved.chapter_id, "c2");
        assert_eq!(saved.page_index, 5);
        assert_eq!(saved.manga_title.as_deref(), Some("Test Manga"));
        assert_eq!(store.all().unwrap().len(), 2);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn hash_dir_hides_raw_manga_id() {
        let store = LocalStore::new("/tmp/unused");
        let dir = store.hash_dir("../escape/attempt");
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap();
        assert_eq!(name.len(), 64);
        assert!(dir.starts_with("/tmp/unused/progress"));
    }

    #[test]
    fn layout_and_favorites_round_trip_and_clear() {
        let root = unique_temp_dir("layout_favorites");
        let store = LocalStore::new(&root);

        assert!(store.load_layout().unwrap().is_none());
        let pref = LayoutPreference {
            layout: PageLayout::Double,
            direction: ReadingDirection::Rtl,
        };
        store.save_layout(&pref).unwrap();
        assert_eq!(store.load_layout().unwrap(), Some(pref));

        let fav = Favorite {
            id: "m1".to_string(),
            title: "Test Manga".to_string(),
            cover_image: None,
        };
        assert!(store.toggle_favorite(fav.clone()).unwrap());
        assert_eq!(store.load_favorites(), vec![fav.clone()]);
        assert!(!store.toggle_favorite(fav.clone()).unwrap());
        assert!(store.load_favorites().is_empty());
        assert!(store.toggle_favorite(fav).unwrap());

        store.put(&position("m1", "c1", 1)).unwrap();
        store.clear_user_data().unwrap();
        assert!(store.get("m1").unwrap().is_none());
        assert!(store.load_layout().unwrap().is_none());
        assert!(store.load_favorites().is_empty());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn replace_all_drops_positions_not_in_the_replacement() {
        let root = unique_temp_dir("replace_all");
        let store = LocalStore::new(&root);
        store.put(&position("old", "c1", 1)).unwrap();

        store
            .replace_all(&[position("new", "c9", 3)])
            .expect("replace should succeed");

        assert!(store.get("old").unwrap().is_none());
        assert_eq!(store.get("new").unwrap().map(|p| p.page_index), Some(3));

        let _ = fs::remove_dir_all(&root);
    }
}
