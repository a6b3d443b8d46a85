//! Storage seams for reading positions and the global layout preference.
//!
//! The session never touches storage directly; the runtime writes through
//! these traits and logs failures instead of surfacing them.

use crate::models::{LayoutPreference, ReadingPosition};
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// One reading position per manga, overwritten on every write.
pub trait ProgressStore: Send + Sync {
    fn get(&self, manga_id: &str) -> Result<Option<ReadingPosition>>;
    fn put(&self, position: &ReadingPosition) -> Result<()>;
    /// Every stored position, most recently read first.
    fn all(&self) -> Result<Vec<ReadingPosition>>;
    /// Replace every stored position, e.g. after pulling from the cloud.
    fn replace_all(&self, positions: &[ReadingPosition]) -> Result<()>;
}

pub trait LayoutStore: Send + Sync {
    fn load_layout(&self) -> Result<Option<LayoutPreference>>;
    fn save_layout(&self, preference: &LayoutPreference) -> Result<()>;
}

/// Process-local store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: Mutex<BTreeMap<String, ReadingPosition>>,
    layout: Mutex<Option<LayoutPreference>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, manga_id: &str) -> Result<Option<ReadingPosition>> {
        let positions = self
            .positions
            .lock()
            .map_err(|_| anyhow!("progress store lock poisoned"))?;
        Ok(positions.get(manga_id).cloned())
    }

    fn put(&self, position: &ReadingPosition) -> Result<()> {
        let mut positions = self
            .positions
            .lock()
            .map_err(|_| anyhow!("progress store lock poisoned"))?;
        positions.insert(position.manga_id.clone(), position.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<ReadingPosition>> {
        let positions = self
            .positions
            .lock()
            .map_err(|_| anyhow!("progress store lock poisoned"))?;
        Ok(sorted_recent_first(positions.values().cloned().collect()))
    }

    fn replace_all(&self, replacement: &[ReadingPosition]) -> Result<()> {
        let mut positions = self
            .positions
            .lock()
            .map_err(|_| anyhow!("progress store lock poisoned"))?;
        positions.clear();
        for position in replacement {
            positions.insert(position.manga_id.clone(), position.clone());
        }
        Ok(())
    }
}

impl LayoutStore for MemoryStore {
    fn load_layout(&self) -> Result<Option<LayoutPreference>> {
        let layout = self
            .layout
            .lock()
            .map_err(|_| anyhow!("layout store lock poisoned"))?;
        Ok(*layout)
    }

    fn save_layout(&self, preference: &LayoutPreference) -> Result<()> {
        let mut layout = self
            .layout
            .lock()
            .map_err(|_| anyhow!("layout store lock poisoned"))?;
        *layout = Some(*preference);
        Ok(())
    }
}

pub(crate) fn sorted_recent_first(mut positions: Vec<ReadingPosition>) -> Vec<ReadingPosition> {
    positions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.manga_id.cmp(&b.manga_id))
    });
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(manga_id: &str, page_index: usize, timestamp: u64) -> ReadingPosition {
        ReadingPosition {
            manga_id: manga_id.to_string(),
            chapter_id: format!("{manga_id}-c1"),
            page_index,
            chapter_label: "Chapter 1".to_string(),
            timestamp,
            manga_title: None,
        }
    }

    #[test]
    fn put_overwrites_the_single_position_per_manga() {
        let store = MemoryStore::new();
        store.put(&position("m", 1, 10)).unwrap();
        store.put(&position("m", 4, 20)).unwrap();

        let saved = store.get("m").unwrap().expect("position should be stored");
        assert_eq!(saved.page_index, 4);
        assert_eq!(store.all().unwrap().len(), 1);
        assert!(store.get("other").unwrap().is_none());
    }

    #[test]
    fn all_lists_most_recent_first_and_replace_all_resets() {
        let store = MemoryStore::new();
        store.put(&position("a", 0, 5)).unwrap();
        store.put(&position("b", 0, 50)).unwrap();
        let ids: Vec<String> = store.all().unwrap().into_iter().map(|p| p.manga_id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        store.replace_all(&[position("c", 2, 1)]).unwrap();
        let ids: Vec<String> = store.all().unwrap().into_iter().map(|p| p.manga_id).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn layout_is_absent_until_saved() {
        let store = MemoryStore::new();
        assert!(store.load_layout().unwrap().is_none());
        let pref = LayoutPreference {
            layout: crate::models::PageLayout::Double,
            direction: crate::models::ReadingDirection::Rtl,
        };
        store.save_layout(&pref).unwrap();
        assert_eq!(store.load_layout().unwrap(), Some(pref));
    }
}
