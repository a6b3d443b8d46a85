//! Executes session effects: fetches on worker threads, renders through a
//! presenter, writes positions and pushes them to the cloud.

use super::navigation::{NavigationController, ReaderInput};
use super::sequencer::resolve_sequence;
use super::session::{Effect, ReaderSession, RenderView, SessionCommand};
use crate::cloud_sync::CloudSync;
use crate::error::ReaderError;
use crate::models::Favorite;
use crate::progress::{LayoutStore, ProgressStore};
use crate::provider::ContentProvider;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, warn};

/// Presentation callbacks. All calls happen on the runtime's thread.
pub trait Presenter {
    fn render(&mut self, view: &RenderView);
    fn chapter_selected(&mut self, chapter_id: &str);
    fn sequence_exhausted(&mut self, manga_id: &str);
    fn no_readable_chapters(&mut self, manga_id: &str);
    fn content_unavailable(&mut self, error: &ReaderError);
    fn navigate_away(&mut self);
}

pub struct ReaderRuntime<P, S>
where
    P: Presenter,
    S: ProgressStore + LayoutStore,
{
    session: ReaderSession,
    navigation: NavigationController,
    provider: Arc<dyn ContentProvider>,
    store: Arc<S>,
    cloud: Option<CloudSync>,
    presenter: P,
    tx: Sender<SessionCommand>,
    rx: Receiver<SessionCommand>,
    in_flight: usize,
    closed: bool,
}

impl<P, S> ReaderRuntime<P, S>
where
    P: Presenter,
    S: ProgressStore + LayoutStore,
{
    pub fn new(
        session: ReaderSession,
        navigation: NavigationController,
        provider: Arc<dyn ContentProvider>,
        store: Arc<S>,
        presenter: P,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session,
            navigation,
            provider,
            store,
            cloud: None,
            presenter,
            tx,
            rx,
            in_flight: 0,
            closed: false,
        }
    }

    pub fn with_cloud_sync(mut self, cloud: CloudSync) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn session(&self) -> &ReaderSession {
        &self.session
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// True once the reader has navigated away.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn open(&mut self) {
        self.dispatch(SessionCommand::Open);
    }

    pub fn forward(&mut self) {
        self.dispatch(SessionCommand::Forward);
    }

    pub fn backward(&mut self) {
        self.dispatch(SessionCommand::Backward);
    }

    pub fn jump(&mut self, index: usize) {
        self.dispatch(SessionCommand::Jump { index });
    }

    pub fn select_chapter(&mut self, chapter_id: impl Into<String>) {
        self.dispatch(SessionCommand::SelectChapter {
            chapter_id: chapter_id.into(),
        });
    }

    pub fn handle_input(&mut self, input: ReaderInput) {
        let preference = self.session.layout_preference();
        match self.navigation.translate(input, &preference) {
            Some(command) => self.dispatch(command),
            None => debug!("Input has no reader binding"),
        }
    }

    pub fn dispatch(&mut self, command: SessionCommand) {
        let effects = self.session.apply(command);
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Apply any fetch results that have already arrived, without blocking.
    pub fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(command) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.dispatch(command);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Block until every fetch started so far (and any it triggers) is done.
    pub fn wait_for_pending(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(command) => {
                    self.in_flight -= 1;
                    self.dispatch(command);
                }
                Err(_) => break,
            }
        }
    }

    /// Wait for fetches and outstanding cloud pushes.
    pub fn settle(&mut self) {
        self.wait_for_pending();
        if let Some(cloud) = self.cloud.as_mut() {
            cloud.settle();
        }
    }

    pub fn push_favorites(&mut self, favorites: Vec<Favorite>) {
        if let Some(cloud) = self.cloud.as_mut() {
            cloud.push_favorites(favorites);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchChapters {
                request_id,
                manga_id,
            } => self.spawn_fetch(move |provider| SessionCommand::ChaptersLoaded {
                request_id,
                result: resolve_sequence(provider, &manga_id),
            }),
            Effect::FetchPages {
                request_id,
                chapter_id,
            } => self.spawn_fetch(move |provider| SessionCommand::PagesLoaded {
                request_id,
                result: provider.get_page_urls(&chapter_id),
                chapter_id,
            }),
            Effect::ChapterSelected { chapter_id } => self.presenter.chapter_selected(&chapter_id),
            Effect::Render(view) => self.presenter.render(&view),
            Effect::SavePosition(position) => {
                if let Err(err) = self.store.put(&position) {
                    warn!(manga = %position.manga_id, "Failed to save reading position: {err:#}");
                }
            }
            Effect::SaveLayout(preference) => {
                if let Err(err) = self.store.save_layout(&preference) {
                    warn!("Failed to save layout preference: {err:#}");
                }
            }
            Effect::PushCloudSync(position) => {
                if let Some(cloud) = self.cloud.as_mut() {
                    cloud.push_position(position);
                }
            }
            Effect::SequenceExhausted { manga_id } => self.presenter.sequence_exhausted(&manga_id),
            Effect::NoReadableChapters { manga_id } => {
                self.presenter.no_readable_chapters(&manga_id)
            }
            Effect::ContentUnavailable(error) => self.presenter.content_unavailable(&error),
            Effect::NavigateAway => {
                self.closed = true;
                self.presenter.navigate_away();
            }
        }
    }

    fn spawn_fetch<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn ContentProvider) -> SessionCommand + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let command = job(provider.as_ref());
            if tx.send(command).is_err() {
                debug!("Reader closed before fetch finished");
            }
        });
    }
}
