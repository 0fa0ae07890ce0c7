//! # Module: HTTP Surface
//!
//! ## Responsibility
//! Serve the composed page, individual slot fragments and a live stream of
//! slot replacements, and turn the page's interaction posts (carousel
//! navigation, lightbox clicks, key presses, frame-size relays, resizes)
//! into widget calls.
//!
//! ## Guarantees
//! - No panics: every failure is an HTTP status
//! - Unknown slots and unconfigured widgets answer `404`
//! - Malformed route parameters answer `400`
//! - The slot stream skips updates it lagged behind on; the page can always
//!   recover by reloading `/`
//!
//! ## NOT Responsible For
//! - Scheduling widgets (the binary owns the task set)
//! - Rendering (widgets write their own slots)

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::frame_sync::{FrameHeightSync, FrameSizeReport};
use crate::metrics;
use crate::page::{self, PAGE_TEMPLATE};
use crate::starfield::StarfieldWidget;
use crate::view::Document;
use crate::widgets::gallery::GalleryWidget;
use crate::widgets::lightbox::{ClickTarget, Key};
use crate::widgets::news::NewsWidget;
use crate::DeckError;

// ── Shared state ──────────────────────────────────────────────────────────

/// Everything the route handlers reach.
///
/// Interactive widgets are optional: a page without the matching slots, or
/// a disabled section, leaves them `None` and their routes answer `404`.
#[derive(Debug)]
pub struct DeckState {
    document: Document,
    template: String,
    gallery: Option<GalleryWidget>,
    news: Option<Arc<NewsWidget>>,
    frame: Option<FrameHeightSync>,
    starfield: Option<StarfieldWidget>,
    started: Instant,
}

impl DeckState {
    /// State serving the bundled page over `document`.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            template: PAGE_TEMPLATE.to_string(),
            gallery: None,
            news: None,
            frame: None,
            starfield: None,
            started: Instant::now(),
        }
    }

    /// Serve `template` instead of the bundled page.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Route gallery and lightbox interactions to `gallery`.
    pub fn with_gallery(mut self, gallery: GalleryWidget) -> Self {
        self.gallery = Some(gallery);
        self
    }

    /// Route strip navigation to `news`.
    pub fn with_news(mut self, news: Arc<NewsWidget>) -> Self {
        self.news = Some(news);
        self
    }

    /// Accept frame-size relays through `frame`.
    pub fn with_frame(mut self, frame: FrameHeightSync) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Redraw `starfield` on resize reports.
    pub fn with_starfield(mut self, starfield: StarfieldWidget) -> Self {
        self.starfield = Some(starfield);
        self
    }

    /// The shared view tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Stop timers owned by interactive widgets (gallery auto-advance).
    pub fn stop_widgets(&self) {
        if let Some(gallery) = &self.gallery {
            gallery.stop();
        }
    }
}

// ── Responses ─────────────────────────────────────────────────────────────

fn not_configured(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} is not configured") })),
    )
        .into_response()
}

fn bad_request(msg: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

fn gallery_status(gallery: &GalleryWidget, changed: bool) -> Response {
    Json(json!({
        "changed": changed,
        "index": gallery.index(),
        "len": gallery.len(),
        "rotating": gallery.is_rotating(),
        "lightbox": gallery.lightbox_open(),
    }))
    .into_response()
}

fn news_status(news: &NewsWidget, changed: bool) -> Response {
    Json(json!({
        "changed": changed,
        "index": news.index(),
        "len": news.len(),
    }))
    .into_response()
}

// ── Page and fragments ────────────────────────────────────────────────────

/// `GET /`: the page with every slot filled in.
async fn index_handler(State(state): State<Arc<DeckState>>) -> Html<String> {
    Html(page::compose(&state.template, &state.document))
}

/// `GET /fragments/:slot`: one slot's current inner HTML.
async fn fragment_handler(
    State(state): State<Arc<DeckState>>,
    Path(slot): Path<String>,
) -> Response {
    match state.document.fragment(&slot) {
        Some(html) => Html(html).into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown slot: {slot}")).into_response(),
    }
}

/// `GET /events`: SSE stream of slot replacements, one `slot` event each.
async fn events_handler(
    State(state): State<Arc<DeckState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.document.subscribe();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(update) => match Event::default().event("slot").json_data(&update) {
                    Ok(event) => yield Ok(event),
                    Err(e) => warn!(slot = %update.slot, error = %e, "slot update not encodable"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged; dropping stale updates");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `GET /health`: liveness and which interactive widgets are wired.
async fn health_handler(State(state): State<Arc<DeckState>>) -> Response {
    Json(json!({
        "status": "healthy",
        "uptime_secs": state.started.elapsed().as_secs(),
        "slots": state.document.slot_ids().len(),
        "gallery": state.gallery.is_some(),
        "news": state.news.is_some(),
        "frame_sync": state.frame.is_some(),
        "starfield": state.starfield.is_some(),
    }))
    .into_response()
}

/// `GET /metrics`: Prometheus text exposition.
async fn metrics_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
        .into_response()
}

// ── Gallery and lightbox ──────────────────────────────────────────────────

async fn gallery_next(State(state): State<Arc<DeckState>>) -> Response {
    match &state.gallery {
        Some(g) => gallery_status(g, g.next()),
        None => not_configured("gallery"),
    }
}

async fn gallery_prev(State(state): State<Arc<DeckState>>) -> Response {
    match &state.gallery {
        Some(g) => gallery_status(g, g.prev()),
        None => not_configured("gallery"),
    }
}

async fn gallery_goto(
    State(state): State<Arc<DeckState>>,
    Path(index): Path<usize>,
) -> Response {
    match &state.gallery {
        Some(g) => gallery_status(g, g.go_to(index)),
        None => not_configured("gallery"),
    }
}

async fn gallery_hover(
    State(state): State<Arc<DeckState>>,
    Path(hover): Path<String>,
) -> Response {
    let Some(g) = &state.gallery else {
        return not_configured("gallery");
    };
    let inside = match hover.as_str() {
        "enter" => true,
        "leave" => false,
        other => return bad_request(format!("unknown hover state: {other}")),
    };
    g.hover(inside);
    gallery_status(g, true)
}

async fn gallery_open(State(state): State<Arc<DeckState>>) -> Response {
    match &state.gallery {
        Some(g) => gallery_status(g, g.open_lightbox()),
        None => not_configured("gallery"),
    }
}

async fn lightbox_click(
    State(state): State<Arc<DeckState>>,
    Path(target): Path<String>,
) -> Response {
    let Some(g) = &state.gallery else {
        return not_configured("lightbox");
    };
    match ClickTarget::parse(&target) {
        Some(t) => gallery_status(g, g.lightbox_click(t)),
        None => bad_request(format!("unknown click target: {target}")),
    }
}

/// `POST /keys/:key`: page-level key press (`Escape`, `ArrowLeft`, `ArrowRight`).
async fn key_handler(State(state): State<Arc<DeckState>>, Path(key): Path<String>) -> Response {
    let Some(key) = Key::parse(&key) else {
        return bad_request(format!("unhandled key: {key}"));
    };
    match &state.gallery {
        Some(g) => gallery_status(g, g.key(key)),
        None => not_configured("gallery"),
    }
}

// ── News strip ────────────────────────────────────────────────────────────

async fn news_next(State(state): State<Arc<DeckState>>) -> Response {
    match &state.news {
        Some(n) => news_status(n, n.next()),
        None => not_configured("news"),
    }
}

async fn news_prev(State(state): State<Arc<DeckState>>) -> Response {
    match &state.news {
        Some(n) => news_status(n, n.prev()),
        None => not_configured("news"),
    }
}

// ── Frame sync and starfield ──────────────────────────────────────────────

/// `POST /frame-size`: a relayed `message` event; `204` when ignored.
async fn frame_size_handler(
    State(state): State<Arc<DeckState>>,
    Json(report): Json<FrameSizeReport>,
) -> Response {
    let Some(frame) = &state.frame else {
        return not_configured("frame sync");
    };
    match frame.apply(&report) {
        Some(height) => Json(json!({ "height": height })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn default_dpr() -> f64 {
    1.0
}

/// Surface size reported by the page.
#[derive(Debug, Clone, Deserialize)]
pub struct ResizeReport {
    /// CSS pixel width.
    pub width: f64,
    /// CSS pixel height.
    pub height: f64,
    /// `window.devicePixelRatio`.
    #[serde(default = "default_dpr")]
    pub dpr: f64,
}

async fn starfield_resize(
    State(state): State<Arc<DeckState>>,
    Json(report): Json<ResizeReport>,
) -> Response {
    match &state.starfield {
        Some(s) => {
            s.resize(report.width, report.height, report.dpr);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_configured("starfield"),
    }
}

// ── Router construction ───────────────────────────────────────────────────

/// Build the [`Router`] with every page and interaction route.
///
/// # Panics
///
/// This function never panics.
pub fn build_router(state: Arc<DeckState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/fragments/:slot", get(fragment_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/gallery/next", post(gallery_next))
        .route("/gallery/prev", post(gallery_prev))
        .route("/gallery/goto/:index", post(gallery_goto))
        .route("/gallery/hover/:state", post(gallery_hover))
        .route("/gallery/open", post(gallery_open))
        .route("/lightbox/click/:target", post(lightbox_click))
        .route("/keys/:key", post(key_handler))
        .route("/news/next", post(news_next))
        .route("/news/prev", post(news_prev))
        .route("/frame-size", post(frame_size_handler))
        .route("/starfield/resize", post(starfield_resize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Server bootstrap ──────────────────────────────────────────────────────

/// Bind `addr` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`DeckError::Server`] if the listener cannot bind or the server
/// terminates abnormally.
pub async fn serve<F>(addr: SocketAddr, state: Arc<DeckState>, shutdown: F) -> Result<(), DeckError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DeckError::Server(format!("bind {addr}: {e}")))?;

    info!(%addr, "mission deck ready at http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DeckError::Server(e.to_string()))
}
