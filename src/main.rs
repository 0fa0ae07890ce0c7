//! Mission deck binary.
//!
//! Loads the configuration, wires every widget to its slots, starts their
//! schedules and serves the page until Ctrl-C.
//!
//! ## Usage
//!
//! ```text
//! mission-deck [--config deck.toml] [--port 8080] [--print-schema]
//! ```
//!
//! ## Environment Variables
//!
//! - `LOG_FORMAT=json`: structured JSON output (production)
//! - `RUST_LOG=info`: log level filter

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mission_deck::config::{self, loader, DeckConfig};
use mission_deck::frame_sync::FrameHeightSync;
use mission_deck::page::{self, PAGE_TEMPLATE};
use mission_deck::server::{self, DeckState};
use mission_deck::starfield::StarfieldWidget;
use mission_deck::widgets::clock::ClockWidget;
use mission_deck::widgets::gallery::{GallerySettings, GalleryTargets, GalleryWidget};
use mission_deck::widgets::mission::{MissionHandle, MissionSettings, MissionTargets, MissionWidget};
use mission_deck::widgets::news::{NewsSettings, NewsTargets, NewsWidget};
use mission_deck::widgets::projects::{ProjectsTargets, ProjectsWidget};
use mission_deck::widgets::telemetry::{TelemetryTargets, TelemetryWidget};
use mission_deck::{init_tracing, metrics, spawn_once, spawn_poll, DeckError, Fetcher, TaskSet};
use parking_lot::Mutex;
use tracing::{info, warn};

// ── CLI ───────────────────────────────────────────────────────────────────

/// Value following `flag` on the command line.
fn arg_value(flag: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn load_config() -> Result<DeckConfig, DeckError> {
    let mut config = match arg_value("--config") {
        Some(path) => loader::load_from_file(&PathBuf::from(path))?,
        None => {
            info!("no --config given; using defaults");
            DeckConfig::default()
        }
    };
    if let Some(port) = arg_value("--port") {
        config.server.port = port
            .parse()
            .map_err(|e| DeckError::Other(format!("invalid --port {port}: {e}")))?;
    }
    Ok(config)
}

// ── Wiring ────────────────────────────────────────────────────────────────

async fn start_widgets(
    config: &DeckConfig,
    fetcher: &Fetcher,
    mut state: DeckState,
    tasks: &mut TaskSet,
) -> Result<DeckState, DeckError> {
    let doc = state.document().clone();

    let mut fallback = MissionHandle::default();
    if config.mission.enabled {
        match MissionTargets::claim(&doc) {
            Some(targets) => {
                let settings = MissionSettings::from_config(config)?;
                let mission = Arc::new(MissionWidget::new(fetcher.clone(), settings, targets));
                // Gallery and news fall back to the mission document's static lists.
                mission.load().await;
                fallback = mission.handle();
                tasks.push(mission.start_countdown());
                tasks.push(mission.start_lookup());
            }
            None => warn!(widget = "mission", "page has no countdown slot; skipped"),
        }
    }

    if config.gallery.enabled {
        match GalleryTargets::claim(&doc) {
            Some(targets) => {
                let settings = GallerySettings::from_config(config)?;
                let interval = settings.endpoint.interval;
                let gallery =
                    GalleryWidget::new(fetcher.clone(), settings, targets, fallback.clone());
                tasks.push(spawn_poll(Arc::new(gallery.clone()), interval));
                state = state.with_gallery(gallery);
            }
            None => warn!(widget = "gallery", "page has no gallery slot; skipped"),
        }
    }

    if config.news.enabled {
        match NewsTargets::claim(&doc) {
            Some(targets) => {
                let settings = NewsSettings::from_config(config)?;
                let interval = settings.endpoint.interval;
                let news = Arc::new(NewsWidget::new(fetcher.clone(), settings, targets, fallback));
                tasks.push(spawn_poll(Arc::clone(&news), interval));
                state = state.with_news(news);
            }
            None => warn!(widget = "news", "page has no news slot; skipped"),
        }
    }

    if config.telemetry.enabled {
        if let Some(targets) = TelemetryTargets::claim(&doc) {
            let telemetry = Arc::new(TelemetryWidget::from_config(config, fetcher.clone(), targets)?);
            let interval = telemetry.interval();
            tasks.push(spawn_poll(telemetry, interval));
        }
    }

    if config.projects.enabled {
        if let Some(targets) = ProjectsTargets::claim(&doc) {
            let projects = Arc::new(ProjectsWidget::from_config(config, fetcher.clone(), targets)?);
            tasks.push(spawn_once(projects));
        }
    }

    if let Some(clock) = ClockWidget::claim(&doc) {
        tasks.push(Arc::new(clock).start());
    }

    if let Some(starfield) = StarfieldWidget::claim(&doc, config.starfield.star_count) {
        state = state.with_starfield(starfield);
    }

    if config.frame.enabled {
        state = state.with_frame(FrameHeightSync::from_config(config, &doc));
    }

    info!(tasks = tasks.len(), "widgets started");
    Ok(state)
}

// ── Main entry point ──────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if has_flag("--print-schema") {
        println!("{}", config::export_schema()?);
        return Ok(());
    }

    let _ = init_tracing();
    metrics::init_metrics()?;

    let config = load_config()?;
    let fetcher = Fetcher::new(
        Duration::from_millis(config.sources.connect_timeout_ms),
        Duration::from_millis(config.sources.request_timeout_ms),
    );

    let doc = page::document_for(PAGE_TEMPLATE);
    info!(slots = doc.slot_ids().len(), "page template loaded");

    let mut tasks = TaskSet::new();
    let state = start_widgets(&config, &fetcher, DeckState::new(doc), &mut tasks).await?;
    let state = Arc::new(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| DeckError::Other(format!("invalid bind address: {e}")))?;

    let tasks = Arc::new(Mutex::new(tasks));
    let shutdown_tasks = Arc::clone(&tasks);
    let shutdown_state = Arc::clone(&state);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler failed; shutting down");
        }
        info!("shutdown requested");
        shutdown_tasks.lock().shutdown();
        shutdown_state.stop_widgets();
    };

    server::serve(addr, state, shutdown).await?;
    info!("mission deck stopped");
    Ok(())
}
