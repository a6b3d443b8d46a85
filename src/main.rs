//! Entry point for the terminal manga reader.
//!
//! - Parse the subcommand.
//! - Load user configuration from `conf/config.toml`.
//! - Pull cloud user data when sync is configured.
//! - Run the requested command; `read` drives a reader session from stdin.

use anyhow::{Context, Result, anyhow};
use manga_theater::cache::LocalStore;
use manga_theater::cloud_sync::{CloudSync, HttpCloudRemote, pull_into_local};
use manga_theater::config::{AppConfig, load_config};
use manga_theater::error::ReaderError;
use manga_theater::models::Favorite;
use manga_theater::progress::{LayoutStore, ProgressStore};
use manga_theater::provider::{ContentProvider, MangaDexClient};
use manga_theater::reader::{
    ClickZone, NavigationController, Presenter, ReaderInput, ReaderRuntime, ReaderSession,
    RenderView,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: manga-theater <search TITLE | read MANGA_ID [CHAPTER_ID] | continue | favorites | clear-data>";

enum Command {
    Search(String),
    Read {
        manga_id: String,
        chapter_id: Option<String>,
    },
    Continue,
    Favorites,
    ClearData,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let command = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        api = %config.api_base_url,
        data_dir = %config.data_dir.display(),
        level = %config.log_level,
        "Starting manga reader"
    );

    let store = Arc::new(LocalStore::new(&config.data_dir));
    let remote = HttpCloudRemote::from_config(&config)?.map(Arc::new);
    if let Some(remote) = &remote {
        if let Err(err) = pull_into_local(remote.as_ref(), &store) {
            warn!("Cloud sync pull failed; using local data: {err:#}");
        }
    }

    match command {
        Command::Search(title) => search(&config, &title),
        Command::Read {
            manga_id,
            chapter_id,
        } => {
            let cloud = remote.map(|remote| CloudSync::new(remote));
            read(&config, store, cloud, manga_id, chapter_id)
        }
        Command::Continue => list_continue_reading(&store),
        Command::Favorites => {
            list_favorites(&store);
            Ok(())
        }
        Command::ClearData => store.clear_user_data(),
    }
}

fn parse_args() -> Result<Command> {
    let mut args = env::args().skip(1);
    let name = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let command = match name.as_str() {
        "search" => {
            let title = args.collect::<Vec<_>>().join(" ");
            Command::Search(title)
        }
        "read" => Command::Read {
            manga_id: args.next().ok_or_else(|| anyhow!(USAGE))?,
            chapter_id: args.next(),
        },
        "continue" => Command::Continue,
        "favorites" => Command::Favorites,
        "clear-data" => Command::ClearData,
        other => return Err(anyhow!("Unknown command `{other}`. {USAGE}")),
    };
    Ok(command)
}

fn search(config: &AppConfig, title: &str) -> Result<()> {
    let client = MangaDexClient::from_config(config)?;
    let results = client.search_manga(title, config.search_limit)?;
    if results.is_empty() {
        println!("No manga found.");
    }
    for manga in &results {
        println!("{}  {} [{}] by {}", manga.id, manga.title, manga.status, manga.author);
        if !manga.tags.is_empty() {
            println!("    {}", manga.tags.join(", "));
        }
    }
    Ok(())
}

fn list_continue_reading(store: &LocalStore) -> Result<()> {
    let positions = store.all().context("failed to read saved positions")?;
    if positions.is_empty() {
        println!("Nothing in progress.");
    }
    for position in positions {
        println!(
            "{}  {} - {}, page {}",
            position.manga_id,
            position.manga_title.as_deref().unwrap_or("(untitled)"),
            position.chapter_label,
            position.page_index + 1
        );
    }
    Ok(())
}

fn list_favorites(store: &LocalStore) {
    let favorites = store.load_favorites();
    if favorites.is_empty() {
        println!("No favorites yet.");
    }
    for favorite in favorites {
        println!("{}  {}", favorite.id, favorite.title);
    }
}

fn read(
    config: &AppConfig,
    store: Arc<LocalStore>,
    cloud: Option<CloudSync>,
    manga_id: String,
    chapter_id: Option<String>,
) -> Result<()> {
    let client = MangaDexClient::from_config(config)?;
    let manga = match client.get_manga(&manga_id) {
        Ok(manga) => Some(manga),
        Err(err) => {
            warn!(manga = %manga_id, "Reading without manga details: {err}");
            None
        }
    };
    let saved = store.get(&manga_id).unwrap_or_else(|err| {
        warn!(manga = %manga_id, "Ignoring unreadable saved position: {err:#}");
        None
    });
    let layout = store
        .load_layout()
        .unwrap_or_else(|err| {
            warn!("Ignoring unreadable layout preference: {err:#}");
            None
        })
        .unwrap_or_else(|| config.default_layout());

    if let Some(manga) = &manga {
        println!("{} by {}", manga.title, manga.author);
    }
    let session = ReaderSession::new(
        manga_id.clone(),
        manga.as_ref().map(|m| m.title.clone()),
        chapter_id,
        saved,
        layout,
    );
    let provider: Arc<dyn ContentProvider> = Arc::new(client);
    let mut runtime = ReaderRuntime::new(
        session,
        NavigationController::new(&config.keys),
        provider,
        Arc::clone(&store),
        TerminalPresenter::default(),
    );
    if let Some(cloud) = cloud {
        runtime = runtime.with_cloud_sync(cloud);
    }

    runtime.open();
    runtime.wait_for_pending();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !runtime.is_closed() {
        print!("> ");
        io::stdout().flush().context("failed to flush prompt")?;
        let Some(line) = lines.next() else {
            runtime.handle_input(ReaderInput::Quit);
            break;
        };
        let line = line.context("failed to read input")?;
        match parse_line(line.trim(), config, runtime.presenter().page_count) {
            LineAction::Input(input) => runtime.handle_input(input),
            LineAction::ListChapters => print_chapters(runtime.session()),
            LineAction::ToggleFavorite => {
                let favorite = manga
                    .as_ref()
                    .map(Favorite::from)
                    .unwrap_or_else(|| Favorite {
                        id: manga_id.clone(),
                        title: manga_id.clone(),
                        cover_image: None,
                    });
                toggle_favorite(&store, &mut runtime, favorite);
            }
            LineAction::Nothing => {}
        }
        runtime.wait_for_pending();
    }

    runtime.settle();
    Ok(())
}

enum LineAction {
    Input(ReaderInput),
    ListChapters,
    ToggleFavorite,
    Nothing,
}

fn parse_line(line: &str, config: &AppConfig, page_count: usize) -> LineAction {
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();
    match head {
        "" => LineAction::Nothing,
        "left" => LineAction::Input(ReaderInput::Click(ClickZone::Left)),
        "right" => LineAction::Input(ReaderInput::Click(ClickZone::Right)),
        "slider" => match rest.parse::<usize>() {
            Ok(page) => LineAction::Input(ReaderInput::slider_at_page(page, page_count)),
            Err(_) => {
                println!("Usage: slider PAGE");
                LineAction::Nothing
            }
        },
        "chapter" if !rest.is_empty() => {
            LineAction::Input(ReaderInput::SelectChapter(rest.to_string()))
        }
        "chapters" => LineAction::ListChapters,
        "next-chapter" => LineAction::Input(ReaderInput::NextChapter),
        "prev-chapter" => LineAction::Input(ReaderInput::PreviousChapter),
        "layout" => LineAction::Input(ReaderInput::Key(config.keys.toggle_layout.clone())),
        "direction" => LineAction::Input(ReaderInput::Key(config.keys.toggle_direction.clone())),
        "fav" => LineAction::ToggleFavorite,
        "q" | "quit" => LineAction::Input(ReaderInput::Quit),
        key => LineAction::Input(ReaderInput::Key(key.to_string())),
    }
}

fn print_chapters(session: &ReaderSession) {
    let current = session.current_chapter().map(|c| c.id.as_str());
    for chapter in session.sequence() {
        let marker = if Some(chapter.id.as_str()) == current { "*" } else { " " };
        let title = chapter.title.as_deref().unwrap_or_default();
        println!("{marker} {}  {} {}", chapter.id, chapter.display_label(), title);
    }
}

fn toggle_favorite(
    store: &LocalStore,
    runtime: &mut ReaderRuntime<TerminalPresenter, LocalStore>,
    favorite: Favorite,
) {
    let title = favorite.title.clone();
    match store.toggle_favorite(favorite) {
        Ok(true) => println!("Added {title} to favorites."),
        Ok(false) => println!("Removed {title} from favorites."),
        Err(err) => {
            warn!("Failed to update favorites: {err:#}");
            return;
        }
    }
    runtime.push_favorites(store.load_favorites());
}

#[derive(Default)]
struct TerminalPresenter {
    page_count: usize,
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, view: &RenderView) {
        self.page_count = view.page_count;
        println!(
            "[{}] page {} ({})",
            view.chapter_label,
            view.page_label,
            if view.is_paired {
                format!("paired, {}", view.direction)
            } else {
                "single".to_string()
            }
        );
        for url in &view.image_urls {
            println!("  {url}");
        }
    }

    fn chapter_selected(&mut self, chapter_id: &str) {
        println!("Opened chapter {chapter_id}");
    }

    fn sequence_exhausted(&mut self, _manga_id: &str) {
        println!("You have reached the last available chapter. Enter q to leave.");
    }

    fn no_readable_chapters(&mut self, _manga_id: &str) {
        println!(
            "This manga has no chapters readable here (licensed, externally hosted or empty)."
        );
    }

    fn content_unavailable(&mut self, error: &ReaderError) {
        println!("{error}. Try again.");
    }

    fn navigate_away(&mut self) {
        println!("Closing reader.");
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        info!("RUST_LOG is set; ignoring configured log level");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
