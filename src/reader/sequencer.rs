//! Chapter ordering and entry selection for one manga.

use crate::error::ReaderError;
use crate::models::{Chapter, ReadingPosition};
use crate::provider::ContentProvider;
use tracing::{debug, info};

/// Fetch the feed and keep only chapters this reader can display, in reading
/// order.
pub fn resolve_sequence(
    provider: &dyn ContentProvider,
    manga_id: &str,
) -> Result<Vec<Chapter>, ReaderError> {
    let feed = provider.get_chapters_for_manga(manga_id)?;
    let total = feed.len();
    let sequence = readable_sequence(feed);
    if sequence.is_empty() {
        info!(manga = manga_id, feed = total, "Feed has no readable chapters");
        return Err(ReaderError::NoReadableChapters {
            manga_id: manga_id.to_string(),
        });
    }
    debug!(
        manga = manga_id,
        feed = total,
        readable = sequence.len(),
        "Resolved chapter sequence"
    );
    Ok(sequence)
}

/// Filter to readable chapters and sort ascending by chapter number.
/// Unnumbered chapters sort as 0; equal numbers keep feed order.
pub fn readable_sequence(feed: Vec<Chapter>) -> Vec<Chapter> {
    let mut sequence: Vec<Chapter> = feed.into_iter().filter(Chapter::is_readable).collect();
    sequence.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
    sequence
}

/// Requested chapter, else the saved position's chapter, else the first.
/// Ids missing from the sequence fall through to the next rule.
pub fn pick_entry_chapter<'a>(
    sequence: &'a [Chapter],
    requested: Option<&str>,
    saved: Option<&ReadingPosition>,
) -> Option<&'a Chapter> {
    let find = |id: &str| sequence.iter().find(|chapter| chapter.id == id);
    requested
        .and_then(find)
        .or_else(|| saved.and_then(|position| find(&position.chapter_id)))
        .or_else(|| sequence.first())
}

pub fn next_chapter<'a>(sequence: &'a [Chapter], current_id: &str) -> Option<&'a Chapter> {
    let idx = position_of(sequence, current_id)?;
    sequence.get(idx + 1)
}

pub fn prev_chapter<'a>(sequence: &'a [Chapter], current_id: &str) -> Option<&'a Chapter> {
    let idx = position_of(sequence, current_id)?;
    idx.checked_sub(1).and_then(|prev| sequence.get(prev))
}

fn position_of(sequence: &[Chapter], chapter_id: &str) -> Option<usize> {
    sequence.iter().position(|chapter| chapter.id == chapter_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Manga;
    use std::sync::{Arc, Mutex};

    fn chapter(id: &str, number: Option<f64>, pages: u32, external: bool) -> Chapter {
        Chapter {
            id: id.to_string(),
            manga_id: "m".to_string(),
            number,
            title: None,
            page_count: pages,
            externally_hosted: external,
        }
    }

    fn position(chapter_id: &str) -> ReadingPosition {
        ReadingPosition {
            manga_id: "m".to_string(),
            chapter_id: chapter_id.to_string(),
            page_index: 0,
            chapter_label: String::new(),
            timestamp: 0,
            manga_title: None,
        }
    }

    struct FeedProvider {
        feed: Result<Vec<Chapter>, ReaderError>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ContentProvider for FeedProvider {
        fn search_manga(&self, _: &str, _: usize) -> Result<Vec<Manga>, ReaderError> {
            Ok(Vec::new())
        }

        fn get_manga(&self, manga_id: &str) -> Result<Manga, ReaderError> {
            Err(ReaderError::unavailable(manga_id, "not needed"))
        }

        fn get_chapters_for_manga(&self, manga_id: &str) -> Result<Vec<Chapter>, ReaderError> {
            self.calls.lock().unwrap().push(manga_id.to_string());
            self.feed.clone()
        }

        fn get_page_urls(&self, _: &str) -> Result<Vec<String>, ReaderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn excludes_unreadable_and_sorts_by_number() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = FeedProvider {
            feed: Ok(vec![
                chapter("c3", Some(3.0), 10, false),
                chapter("licensed", Some(1.5), 10, true),
                chapter("c1", Some(1.0), 12, false),
                chapter("empty", Some(2.0), 0, false),
                chapter("oneshot", None, 8, false),
                chapter("c2.5", Some(2.5), 4, false),
            ]),
            calls: calls.clone(),
        };

        let sequence = resolve_sequence(&provider, "m").unwrap();
        let ids: Vec<&str> = sequence.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, vec!["oneshot", "c1", "c2.5", "c3"]);
        assert!(sequence.iter().all(Chapter::is_readable));
        assert!(
            sequence
                .windows(2)
                .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
        );
        assert_eq!(calls.lock().unwrap().as_slice(), ["m"]);
    }

    #[test]
    fn equal_numbers_keep_feed_order() {
        let sequence = readable_sequence(vec![
            chapter("b", Some(1.0), 3, false),
            chapter("a", Some(1.0), 3, false),
            chapter("z", None, 3, false),
        ]);
        let ids: Vec<&str> = sequence.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "b", "a"]);
    }

    #[test]
    fn empty_filtered_feed_is_no_readable_chapters() {
        let provider = FeedProvider {
            feed: Ok(vec![chapter("x", Some(1.0), 5, true)]),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let err = resolve_sequence(&provider, "m").unwrap_err();
        assert!(err.is_terminal());
        assert_eq!(
            err,
            ReaderError::NoReadableChapters {
                manga_id: "m".to_string()
            }
        );
    }

    #[test]
    fn provider_failure_stays_content_unavailable() {
        let provider = FeedProvider {
            feed: Err(ReaderError::unavailable("chapter feed", "timeout")),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let err = resolve_sequence(&provider, "m").unwrap_err();
        assert!(!err.is_terminal());
        assert!(matches!(err, ReaderError::ContentUnavailable { .. }));
    }

    #[test]
    fn entry_chapter_priority_chain() {
        let sequence = vec![
            chapter("c1", Some(1.0), 3, false),
            chapter("c2", Some(2.0), 3, false),
            chapter("c3", Some(3.0), 3, false),
        ];
        let saved = position("c2");

        let pick = |requested: Option<&str>, saved: Option<&ReadingPosition>| {
            pick_entry_chapter(&sequence, requested, saved).map(|c| c.id.clone())
        };

        let stale = position("also-gone");

        assert_eq!(pick(Some("c3"), Some(&saved)).as_deref(), Some("c3"));
        assert_eq!(pick(None, Some(&saved)).as_deref(), Some("c2"));
        assert_eq!(pick(Some("gone"), Some(&saved)).as_deref(), Some("c2"));
        assert_eq!(pick(Some("gone"), Some(&stale)).as_deref(), Some("c1"));
        assert_eq!(pick(None, None).as_deref(), Some("c1"));
        assert_eq!(pick_entry_chapter(&[], Some("c1"), Some(&saved)), None);
    }

    #[test]
    fn neighbours_are_terminal_at_the_ends() {
        let sequence = vec![
            chapter("c1", Some(1.0), 3, false),
            chapter("c2", Some(2.0), 3, false),
        ];
        assert_eq!(next_chapter(&sequence, "c1").map(|c| c.id.as_str()), Some("c2"));
        assert!(next_chapter(&sequence, "c2").is_none());
        assert_eq!(prev_chapter(&sequence, "c2").map(|c| c.id.as_str()), Some("c1"));
        assert!(prev_chapter(&sequence, "c1").is_none());
        assert!(next_chapter(&sequence, "unknown").is_none());
    }
}
