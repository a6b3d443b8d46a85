//! One reading visit to one manga.
//!
//! `ReaderSession` is a pure state machine: it never performs I/O. Every
//! command returns the effects the runtime must carry out (fetches, renders,
//! position writes, cloud pushes). Fetch results come back as commands tagged
//! with the request id they answer; anything not answering the current
//! request is dropped.

use super::cursor::PageCursor;
use super::sequencer::{next_chapter, pick_entry_chapter, prev_chapter, readable_sequence};
use crate::error::ReaderError;
use crate::models::{
    Chapter, LayoutPreference, PageLayout, ReadingDirection, ReadingPosition, now_unix_millis,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoChapterLoaded,
    ChapterLoaded,
    SequenceExhausted,
    NoReadableChapters,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::SequenceExhausted | SessionState::NoReadableChapters
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Start the visit, or retry it after a failed fetch.
    Open,
    Forward,
    Backward,
    Jump {
        index: usize,
    },
    SelectChapter {
        chapter_id: String,
    },
    NextChapter,
    PreviousChapter,
    SetLayout {
        layout: PageLayout,
    },
    SetDirection {
        direction: ReadingDirection,
    },
    Quit,
    ChaptersLoaded {
        request_id: u64,
        result: Result<Vec<Chapter>, ReaderError>,
    },
    PagesLoaded {
        request_id: u64,
        chapter_id: String,
        result: Result<Vec<String>, ReaderError>,
    },
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            SessionCommand::Open => "open",
            SessionCommand::Forward => "forward",
            SessionCommand::Backward => "backward",
            SessionCommand::Jump { .. } => "jump",
            SessionCommand::SelectChapter { .. } => "select_chapter",
            SessionCommand::NextChapter => "next_chapter",
            SessionCommand::PreviousChapter => "previous_chapter",
            SessionCommand::SetLayout { .. } => "set_layout",
            SessionCommand::SetDirection { .. } => "set_direction",
            SessionCommand::Quit => "quit",
            SessionCommand::ChaptersLoaded { .. } => "chapters_loaded",
            SessionCommand::PagesLoaded { .. } => "pages_loaded",
        }
    }
}

/// Everything a presenter needs to draw the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderView {
    pub manga_id: String,
    pub chapter_id: String,
    pub chapter_label: String,
    /// On-screen order, left to right.
    pub image_urls: Vec<String>,
    /// Reading order.
    pub displayed_indices: Vec<usize>,
    pub page_label: String,
    pub page_count: usize,
    pub is_paired: bool,
    pub direction: ReadingDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchChapters { request_id: u64, manga_id: String },
    FetchPages { request_id: u64, chapter_id: String },
    ChapterSelected { chapter_id: String },
    Render(RenderView),
    SavePosition(ReadingPosition),
    SaveLayout(LayoutPreference),
    PushCloudSync(ReadingPosition),
    SequenceExhausted { manga_id: String },
    NoReadableChapters { manga_id: String },
    ContentUnavailable(ReaderError),
    NavigateAway,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingLoad {
    Chapters {
        request_id: u64,
    },
    Pages {
        request_id: u64,
        chapter_id: String,
        resume: Option<usize>,
    },
}

impl PendingLoad {
    fn request_id(&self) -> u64 {
        match self {
            PendingLoad::Chapters { request_id } | PendingLoad::Pages { request_id, .. } => {
                *request_id
            }
        }
    }
}

pub struct ReaderSession {
    manga_id: String,
    manga_title: Option<String>,
    requested_chapter: Option<String>,
    saved_position: Option<ReadingPosition>,
    state: SessionState,
    sequence: Vec<Chapter>,
    current_chapter: Option<Chapter>,
    cursor: PageCursor,
    pending: Option<PendingLoad>,
    request_id: u64,
    clock: fn() -> u64,
}

impl ReaderSession {
    pub fn new(
        manga_id: impl Into<String>,
        manga_title: Option<String>,
        requested_chapter: Option<String>,
        saved_position: Option<ReadingPosition>,
        layout: LayoutPreference,
    ) -> Self {
        Self {
            manga_id: manga_id.into(),
            manga_title,
            requested_chapter,
            saved_position,
            state: SessionState::NoChapterLoaded,
            sequence: Vec::new(),
            current_chapter: None,
            cursor: PageCursor::new(layout.layout, layout.direction),
            pending: None,
            request_id: 0,
            clock: now_unix_millis,
        }
    }

    /// Replace the timestamp source used for reading positions.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn manga_id(&self) -> &str {
        &self.manga_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sequence(&self) -> &[Chapter] {
        &self.sequence
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.current_chapter.as_ref()
    }

    pub fn page_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn layout_preference(&self) -> LayoutPreference {
        LayoutPreference {
            layout: self.cursor.layout(),
            direction: self.cursor.direction(),
        }
    }

    pub fn apply(&mut self, command: SessionCommand) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.state.is_terminal() && command != SessionCommand::Quit {
            if let Some(request_id) = response_request_id(&command) {
                debug!(request_id, "Ignoring fetch result after session ended");
            } else {
                debug!(
                    action = command.action(),
                    state = ?self.state,
                    "Ignoring input in terminal state"
                );
            }
            return effects;
        }

        match command {
            SessionCommand::Open => self.handle_open(&mut effects),
            SessionCommand::Forward => self.handle_step(true, &mut effects),
            SessionCommand::Backward => self.handle_step(false, &mut effects),
            SessionCommand::Jump { index } => self.handle_jump(index, &mut effects),
            SessionCommand::SelectChapter { chapter_id } => {
                self.handle_select_chapter(&chapter_id, &mut effects)
            }
            SessionCommand::NextChapter => self.handle_adjacent_chapter(true, &mut effects),
            SessionCommand::PreviousChapter => self.handle_adjacent_chapter(false, &mut effects),
            SessionCommand::SetLayout { layout } => {
                self.cursor.set_layout(layout);
                info!(%layout, "Changed page layout");
                self.handle_preference_changed(&mut effects);
            }
            SessionCommand::SetDirection { direction } => {
                self.cursor.set_direction(direction);
                info!(%direction, "Changed reading direction");
                self.handle_preference_changed(&mut effects);
            }
            SessionCommand::Quit => {
                self.pending = None;
                info!(manga = %self.manga_id, "Leaving reader");
                effects.push(Effect::NavigateAway);
            }
            SessionCommand::ChaptersLoaded { request_id, result } => {
                self.handle_chapters_loaded(request_id, result, &mut effects)
            }
            SessionCommand::PagesLoaded {
                request_id,
                chapter_id,
                result,
            } => self.handle_pages_loaded(request_id, chapter_id, result, &mut effects),
        }

        effects
    }

    fn handle_open(&mut self, effects: &mut Vec<Effect>) {
        if self.state != SessionState::NoChapterLoaded {
            debug!(state = ?self.state, "Session already open");
            return;
        }
        if self.sequence.is_empty() {
            let request_id = self.next_request_id();
            self.pending = Some(PendingLoad::Chapters { request_id });
            info!(manga = %self.manga_id, request_id, "Requesting chapter feed");
            effects.push(Effect::FetchChapters {
                request_id,
                manga_id: self.manga_id.clone(),
            });
        } else {
            self.begin_entry_load(effects);
        }
    }

    fn handle_chapters_loaded(
        &mut self,
        request_id: u64,
        result: Result<Vec<Chapter>, ReaderError>,
        effects: &mut Vec<Effect>,
    ) {
        if !matches!(self.pending, Some(PendingLoad::Chapters { request_id: current }) if current == request_id)
        {
            debug!(
                request_id,
                pending = ?self.pending.as_ref().map(PendingLoad::request_id),
                "Ignoring stale chapter feed"
            );
            return;
        }
        self.pending = None;

        match result {
            Ok(feed) => {
                self.sequence = readable_sequence(feed);
                if self.sequence.is_empty() {
                    self.enter_no_readable_chapters(effects);
                    return;
                }
                info!(
                    manga = %self.manga_id,
                    chapters = self.sequence.len(),
                    "Chapter sequence ready"
                );
                self.begin_entry_load(effects);
            }
            Err(err) if err.is_terminal() => self.enter_no_readable_chapters(effects),
            Err(err) => {
                warn!(manga = %self.manga_id, "Chapter feed unavailable: {err}");
                effects.push(Effect::ContentUnavailable(err));
            }
        }
    }

    fn begin_entry_load(&mut self, effects: &mut Vec<Effect>) {
        let requested = self.requested_chapter.as_deref();
        let Some(entry) =
            pick_entry_chapter(&self.sequence, requested, self.saved_position.as_ref())
        else {
            self.enter_no_readable_chapters(effects);
            return;
        };
        let explicitly_requested = requested.is_some_and(|id| id == entry.id);
        let resume = self
            .saved_position
            .as_ref()
            .filter(|saved| !explicitly_requested && saved.chapter_id == entry.id)
            .map(|saved| saved.page_index);
        let chapter_id = entry.id.clone();
        if let Some(page) = resume {
            info!(chapter = %chapter_id, page = page + 1, "Resuming from saved position");
        }
        self.begin_page_load(chapter_id, resume, effects);
    }

    fn begin_page_load(
        &mut self,
        chapter_id: String,
        resume: Option<usize>,
        effects: &mut Vec<Effect>,
    ) {
        let request_id = self.next_request_id();
        debug!(chapter = %chapter_id, request_id, "Requesting chapter pages");
        self.pending = Some(PendingLoad::Pages {
            request_id,
            chapter_id: chapter_id.clone(),
            resume,
        });
        effects.push(Effect::FetchPages {
            request_id,
            chapter_id,
        });
    }

    fn handle_pages_loaded(
        &mut self,
        request_id: u64,
        chapter_id: String,
        result: Result<Vec<String>, ReaderError>,
        effects: &mut Vec<Effect>,
    ) {
        let resume = match &self.pending {
            Some(PendingLoad::Pages {
                request_id: current,
                chapter_id: pending_chapter,
                resume,
            }) if *current == request_id && *pending_chapter == chapter_id => *resume,
            _ => {
                debug!(
                    request_id,
                    chapter = %chapter_id,
                    pending = ?self.pending.as_ref().map(PendingLoad::request_id),
                    "Ignoring stale chapter pages"
                );
                return;
            }
        };
        self.pending = None;

        let pages = match result {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                let err = ReaderError::unavailable(
                    format!("pages for chapter {chapter_id}"),
                    "provider returned no pages",
                );
                warn!("{err}");
                effects.push(Effect::ContentUnavailable(err));
                return;
            }
            Err(err) => {
                warn!(chapter = %chapter_id, "Chapter pages unavailable: {err}");
                effects.push(Effect::ContentUnavailable(err));
                return;
            }
        };

        let Some(chapter) = self.sequence.iter().find(|c| c.id == chapter_id).cloned() else {
            warn!(chapter = %chapter_id, "Loaded pages for a chapter outside the sequence");
            return;
        };

        let resume = resume.map(|page| page.min(pages.len() - 1));
        self.cursor.load_chapter(pages, resume);
        self.current_chapter = Some(chapter);
        self.state = SessionState::ChapterLoaded;
        info!(
            chapter = %chapter_id,
            pages = self.cursor.page_count(),
            page = self.cursor.index() + 1,
            "Chapter loaded"
        );
        effects.push(Effect::ChapterSelected { chapter_id });
        self.push_render_effects(effects);
    }

    fn handle_step(&mut self, forward: bool, effects: &mut Vec<Effect>) {
        if !self.ready_for_page_input(if forward { "forward" } else { "backward" }) {
            return;
        }
        let before = self.cursor.index();
        let outcome = self.cursor.step(forward);
        if outcome.crossed_chapter_boundary {
            self.cross_chapter_boundary(effects);
        } else if outcome.new_index != before {
            info!(page = outcome.new_index + 1, forward, "Navigated to page");
            self.push_render_effects(effects);
        }
    }

    fn cross_chapter_boundary(&mut self, effects: &mut Vec<Effect>) {
        let Some(current) = self.current_chapter.as_ref() else {
            return;
        };
        match next_chapter(&self.sequence, &current.id) {
            Some(next) => {
                info!(from = %current.id, to = %next.id, "Advancing to next chapter");
                let next_id = next.id.clone();
                self.begin_page_load(next_id, None, effects);
            }
            None => {
                info!(manga = %self.manga_id, "Reached the end of the last chapter");
                self.state = SessionState::SequenceExhausted;
                effects.push(Effect::SequenceExhausted {
                    manga_id: self.manga_id.clone(),
                });
            }
        }
    }

    fn handle_jump(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if !self.ready_for_page_input("jump") {
            return;
        }
        let landed = self.cursor.set_index(index);
        debug!(requested = index, page = landed + 1, "Jumped to page");
        self.push_render_effects(effects);
    }

    fn handle_select_chapter(&mut self, chapter_id: &str, effects: &mut Vec<Effect>) {
        if !self.sequence.iter().any(|c| c.id == chapter_id) {
            warn!(chapter = chapter_id, "Ignoring selection of unknown chapter");
            return;
        }
        info!(chapter = chapter_id, "Chapter selected");
        self.begin_page_load(chapter_id.to_string(), None, effects);
    }

    fn handle_adjacent_chapter(&mut self, forward: bool, effects: &mut Vec<Effect>) {
        let Some(current) = self.current_chapter.as_ref() else {
            debug!("No chapter loaded yet");
            return;
        };
        let target = if forward {
            next_chapter(&self.sequence, &current.id)
        } else {
            prev_chapter(&self.sequence, &current.id)
        };
        match target {
            Some(chapter) => {
                let chapter_id = chapter.id.clone();
                info!(chapter = %chapter_id, forward, "Switching chapter");
                self.begin_page_load(chapter_id, None, effects);
            }
            None => debug!(chapter = %current.id, forward, "No adjacent chapter"),
        }
    }

    fn handle_preference_changed(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::SaveLayout(self.layout_preference()));
        if self.state == SessionState::ChapterLoaded && self.pending.is_none() {
            self.push_render_effects(effects);
        }
    }

    fn enter_no_readable_chapters(&mut self, effects: &mut Vec<Effect>) {
        info!(manga = %self.manga_id, "No readable chapters");
        self.state = SessionState::NoReadableChapters;
        effects.push(Effect::NoReadableChapters {
            manga_id: self.manga_id.clone(),
        });
    }

    fn ready_for_page_input(&self, action: &str) -> bool {
        if self.pending.is_some() {
            debug!(action, "Ignoring page input while a chapter is loading");
            return false;
        }
        if self.state != SessionState::ChapterLoaded {
            debug!(action, state = ?self.state, "Ignoring page input without a chapter");
            return false;
        }
        true
    }

    fn push_render_effects(&self, effects: &mut Vec<Effect>) {
        let Some(chapter) = self.current_chapter.as_ref() else {
            return;
        };
        let view = self.cursor.current_view();
        let chapter_label = chapter.display_label();
        let position = ReadingPosition {
            manga_id: self.manga_id.clone(),
            chapter_id: chapter.id.clone(),
            page_index: self.cursor.index(),
            chapter_label: chapter_label.clone(),
            timestamp: (self.clock)(),
            manga_title: self.manga_title.clone(),
        };
        effects.push(Effect::Render(RenderView {
            manga_id: self.manga_id.clone(),
            chapter_id: chapter.id.clone(),
            chapter_label,
            image_urls: self.cursor.image_urls(),
            displayed_indices: view.displayed_indices,
            page_label: self.cursor.page_label(),
            page_count: self.cursor.page_count(),
            is_paired: view.is_paired,
            direction: self.cursor.direction(),
        }));
        effects.push(Effect::SavePosition(position.clone()));
        effects.push(Effect::PushCloudSync(position));
    }

    fn next_request_id(&mut self) -> u64 {
        self.request_id = self.request_id.wrapping_add(1);
        self.request_id
    }
}

fn response_request_id(command: &SessionCommand) -> Option<u64> {
    match command {
        SessionCommand::ChaptersLoaded { request_id, .. }
        | SessionCommand::PagesLoaded { request_id, .. } => Some(*request_id),
        _ => None,
    }
}
