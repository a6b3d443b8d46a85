//! Best-effort sync of reading progress and favorites to a remote user
//! document.
//!
//! Pushes are merge-style partial updates sent in order by one background
//! worker. A failed push is logged and forgotten; local state is never
//! rolled back.

use crate::cache::LocalStore;
use crate::config::AppConfig;
use crate::models::{Favorite, ReadingPosition, now_unix_millis};
use crate::progress::ProgressStore;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Full remote document for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    #[serde(default)]
    pub reading_progress: BTreeMap<String, ReadingPosition>,
    #[serde(default)]
    pub last_updated: Option<u64>,
}

/// Partial update; absent fields are left untouched remotely.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<Favorite>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_progress: Option<BTreeMap<String, ReadingPosition>>,
    pub last_updated: u64,
}

impl UserDataPatch {
    pub fn progress(position: ReadingPosition, now: u64) -> Self {
        let mut reading_progress = BTreeMap::new();
        reading_progress.insert(position.manga_id.clone(), position);
        Self {
            favorites: None,
            reading_progress: Some(reading_progress),
            last_updated: now,
        }
    }

    pub fn favorites(favorites: Vec<Favorite>, now: u64) -> Self {
        Self {
            favorites: Some(favorites),
            reading_progress: None,
            last_updated: now,
        }
    }
}

pub trait CloudRemote: Send + Sync {
    fn push(&self, patch: &UserDataPatch) -> Result<()>;
    /// `None` when the user has no remote document yet.
    fn pull(&self) -> Result<Option<UserData>>;
}

/// `PATCH`/`GET` against `{endpoint}/users/{user_id}`.
pub struct HttpCloudRemote {
    http: Client,
    user_url: String,
    token: Option<String>,
}

impl HttpCloudRemote {
    /// `Ok(None)` when sync is disabled or not fully configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some((endpoint, user_id)) = config.cloud_sync.target() else {
            return Ok(None);
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build cloud sync client")?;
        Ok(Some(Self {
            http,
            user_url: format!("{}/users/{}", endpoint.trim_end_matches('/'), user_id),
            token: config
                .cloud_sync
                .token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        }))
    }
}

impl CloudRemote for HttpCloudRemote {
    fn push(&self, patch: &UserDataPatch) -> Result<()> {
        let body = serde_json::to_string(patch).context("failed to encode sync payload")?;
        let mut request = self
            .http
            .patch(&self.user_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .with_context(|| format!("cloud sync request to {} failed", self.user_url))?;
        if !response.status().is_success() {
            bail!("cloud sync rejected update: HTTP {}", response.status());
        }
        Ok(())
    }

    fn pull(&self) -> Result<Option<UserData>> {
        let mut request = self.http.get(&self.user_url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .with_context(|| format!("cloud sync request to {} failed", self.user_url))?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("cloud sync pull failed: HTTP {}", response.status());
        }
        let body = response.text().context("failed to read cloud sync body")?;
        let data = serde_json::from_str(&body).context("invalid cloud user document")?;
        Ok(Some(data))
    }
}

/// Fire-and-forget pusher. Patches queue on a channel and a single worker
/// sends them in submission order, so the remote always ends on the latest
/// position.
pub struct CloudSync {
    remote: Arc<dyn CloudRemote>,
    queue: Option<PushQueue>,
    clock: fn() -> u64,
}

struct PushQueue {
    sender: mpsc::Sender<UserDataPatch>,
    worker: JoinHandle<()>,
}

impl CloudSync {
    pub fn new(remote: Arc<dyn CloudRemote>) -> Self {
        Self {
            remote,
            queue: None,
            clock: now_unix_millis,
        }
    }

    pub fn push_position(&mut self, position: ReadingPosition) {
        let patch = UserDataPatch::progress(position, (self.clock)());
        self.enqueue(patch);
    }

    pub fn push_favorites(&mut self, favorites: Vec<Favorite>) {
        let patch = UserDataPatch::favorites(favorites, (self.clock)());
        self.enqueue(patch);
    }

    /// Block until every queued push has been sent. Later pushes start a
    /// fresh worker.
    pub fn settle(&mut self) {
        let Some(PushQueue { sender, worker }) = self.queue.take() else {
            return;
        };
        drop(sender);
        if worker.join().is_err() {
            warn!("Cloud sync worker panicked");
        }
    }

    fn enqueue(&mut self, patch: UserDataPatch) {
        let queue = self.queue.get_or_insert_with(|| {
            let (sender, receiver) = mpsc::channel();
            let remote = Arc::clone(&self.remote);
            let worker = thread::spawn(move || run_pushes(remote.as_ref(), receiver));
            PushQueue { sender, worker }
        });
        if let Err(mpsc::SendError(patch)) = queue.sender.send(patch) {
            warn!(at = patch.last_updated, "Cloud sync worker is gone; dropping push");
            self.queue = None;
        }
    }
}

fn run_pushes(remote: &dyn CloudRemote, receiver: mpsc::Receiver<UserDataPatch>) {
    for patch in receiver {
        match remote.push(&patch) {
            Ok(()) => debug!(at = patch.last_updated, "Cloud sync push complete"),
            Err(err) => warn!("Cloud sync push failed: {err:#}"),
        }
    }
    debug!("Cloud sync queue closed");
}

/// Overwrite local progress and favorites with the remote document, if one
/// exists. Returns whether anything was applied.
pub fn pull_into_local(remote: &dyn CloudRemote, store: &LocalStore) -> Result<bool> {
    let Some(data) = remote.pull()? else {
        debug!("No remote user document yet");
        return Ok(false);
    };
    let positions: Vec<ReadingPosition> = data.reading_progress.into_values().collect();
    store.replace_all(&positions)?;
    store.save_favorites(&data.favorites)?;
    info!(
        positions = positions.len(),
        favorites = data.favorites.len(),
        "Applied cloud user data"
    );
    Ok(true)
}
