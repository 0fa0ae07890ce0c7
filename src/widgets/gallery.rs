//! # Widget: Image Gallery
//!
//! ## Responsibility
//! Fetch the image search, keep a bounded slide sequence, auto-advance it,
//! and route navigation, hover, keyboard and lightbox interactions.
//!
//! ## Guarantees
//! - At most `max_items` slides, each with a non-empty image link
//! - An empty or failed fetch shows the mission document's static images
//! - Auto-advance runs only with more than one slide and no hover; any
//!   explicit navigation restarts its period
//! - Arrow keys are ignored while the lightbox is open
//!
//! ## NOT Responsible For
//! - Loading the mission document (see `mission`)

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DeckConfig};
use crate::fetch::{Endpoint, Fetcher};
use crate::metrics;
use crate::sanitize::{escape_html, sanitize_url};
use crate::schedule::{spawn_repeating, TaskHandle};
use crate::view::{Document, Slot};
use crate::widgets::carousel::SlideCarousel;
use crate::widgets::lightbox::{ClickTarget, Key, Lightbox};
use crate::widgets::mission::MissionHandle;
use crate::widgets::PollWidget;

/// Title used when an image record has none.
pub const DEFAULT_TITLE: &str = "NASA Artemis Image";

/// Description length kept from a record, in characters.
pub const DESCRIPTION_CHARS: usize = 100;

/// Slot names this widget writes.
pub mod slots {
    /// The current slide. Required.
    pub const GALLERY: &str = "gallery";
    /// Pagination dots.
    pub const DOTS: &str = "gallery-dots";
    /// Prev/next buttons.
    pub const NAV: &str = "gallery-nav";
    /// Lightbox overlay.
    pub const LIGHTBOX: &str = "lightbox";
}

// ── Records ────────────────────────────────────────────────────────────────

/// A displayable image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryImage {
    /// Image URL.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub url: String,
    /// Title, also the lightbox caption.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub title: String,
    /// Short description.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub description: String,
}

/// Image-search response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageSearch {
    /// Result envelope.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub collection: ImageCollection,
}

/// Result envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageCollection {
    /// Matching assets.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub items: Vec<ImageItem>,
}

/// One asset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageItem {
    /// Asset links; the first one is the preview.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub links: Vec<ImageLink>,
    /// Metadata; the first entry is used.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub data: Vec<ImageData>,
}

/// Asset link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageLink {
    /// Link target.
    pub href: Option<String>,
}

/// Asset metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageData {
    /// Title.
    pub title: Option<String>,
    /// Long description.
    pub description: Option<String>,
}

/// Map search results to slides: linked items only, first `max`, titles
/// defaulted and descriptions truncated.
pub fn extract_images(search: &ImageSearch, max: usize) -> Vec<GalleryImage> {
    search
        .collection
        .items
        .iter()
        .filter_map(|item| {
            let href = item.links.first()?.href.as_deref()?;
            if href.trim().is_empty() {
                return None;
            }
            let data = item.data.first();
            let title = data
                .and_then(|d| d.title.as_deref())
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_TITLE);
            let description = data
                .and_then(|d| d.description.as_deref())
                .map(|d| d.chars().take(DESCRIPTION_CHARS).collect())
                .unwrap_or_default();
            Some(GalleryImage {
                url: href.to_string(),
                title: title.to_string(),
                description,
            })
        })
        .take(max)
        .collect()
}

// ── Rendering ──────────────────────────────────────────────────────────────

const EMPTY_GALLERY: &str = r#"<div class="gallery-loading"><div class="loading-spinner"></div><span>No images available</span></div>"#;

fn render_slide(image: Option<&GalleryImage>) -> String {
    let Some(image) = image else {
        return EMPTY_GALLERY.to_string();
    };
    let title = escape_html(&image.title);
    format!(
        r#"<div class="gallery-item carousel-active" data-gallery-open><img src="{src}" alt="{title}" loading="lazy"><div class="gallery-item-overlay"><span class="gallery-item-title">{title}</span><span class="gallery-item-desc">{desc}</span></div></div>"#,
        src = sanitize_url(&image.url),
        desc = escape_html(&image.description),
    )
}

fn render_dots(len: usize, current: usize) -> String {
    (0..len)
        .map(|i| {
            let class = if i == current { "carousel-dot active" } else { "carousel-dot" };
            format!(
                r#"<button class="{class}" aria-label="Go to image {n}" data-gallery-goto="{i}"></button>"#,
                n = i + 1
            )
        })
        .collect()
}

fn render_nav(len: usize) -> String {
    let disabled = if len <= 1 { " disabled" } else { "" };
    format!(
        r#"<button class="carousel-nav prev" id="gallery-carousel-prev" aria-label="Previous image" data-gallery-nav="prev"{disabled}>&#8249;</button><button class="carousel-nav next" id="gallery-carousel-next" aria-label="Next image" data-gallery-nav="next"{disabled}>&#8250;</button>"#
    )
}

// ── Widget ─────────────────────────────────────────────────────────────────

/// Endpoint and carousel options.
#[derive(Debug, Clone)]
pub struct GallerySettings {
    /// Image search.
    pub endpoint: Endpoint,
    /// Slides kept per fetch.
    pub max_items: usize,
    /// Auto-advance period.
    pub rotation_delay: Duration,
    /// Whether slides advance on their own.
    pub auto_advance: bool,
}

impl GallerySettings {
    /// Settings from the `[gallery]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint URL does not resolve.
    pub fn from_config(config: &DeckConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: config.gallery_endpoint()?,
            max_items: config.gallery.max_items,
            rotation_delay: Duration::from_millis(config.gallery.rotation_delay_ms),
            auto_advance: config.gallery.auto_advance,
        })
    }
}

/// View targets. Only the slide slot is required.
#[derive(Debug)]
pub struct GalleryTargets {
    gallery: Slot,
    dots: Option<Slot>,
    nav: Option<Slot>,
    lightbox: Option<Slot>,
}

impl GalleryTargets {
    /// Claim the gallery slots; `None` without a slide slot.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            gallery: doc.claim(slots::GALLERY)?,
            dots: doc.claim(slots::DOTS),
            nav: doc.claim(slots::NAV),
            lightbox: doc.claim(slots::LIGHTBOX),
        })
    }
}

#[derive(Debug, Default)]
struct GalleryState {
    carousel: SlideCarousel<GalleryImage>,
    lightbox: Lightbox,
    hovering: bool,
    rotation: Option<TaskHandle>,
    /// Bumped on every rotation restart; stale ticks compare unequal.
    rotation_generation: u64,
}

impl GalleryState {
    fn cancel_rotation(&mut self) {
        self.rotation = None;
        self.rotation_generation = self.rotation_generation.wrapping_add(1);
    }
}

#[derive(Debug)]
struct GalleryInner {
    fetcher: Fetcher,
    settings: GallerySettings,
    targets: GalleryTargets,
    fallback: MissionHandle,
    state: Mutex<GalleryState>,
}

/// Single-slide image carousel with lightbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GalleryWidget {
    inner: Arc<GalleryInner>,
}

impl GalleryWidget {
    /// Build the widget; slides arrive with the first refresh.
    pub fn new(
        fetcher: Fetcher,
        settings: GallerySettings,
        targets: GalleryTargets,
        fallback: MissionHandle,
    ) -> Self {
        Self {
            inner: Arc::new(GalleryInner {
                fetcher,
                settings,
                targets,
                fallback,
                state: Mutex::new(GalleryState::default()),
            }),
        }
    }

    /// Replace the slide sequence, return to the first slide and restart
    /// auto-advance.
    pub fn show(&self, images: Vec<GalleryImage>) {
        let mut state = self.inner.state.lock();
        state.carousel.replace(images);
        self.inner.render(&state);
        self.inner.restart_rotation(&mut state);
    }

    /// Show slide `index`; out-of-range requests are ignored.
    pub fn go_to(&self, index: usize) -> bool {
        self.navigate(|c| c.go_to(index))
    }

    /// Next slide, wrapping.
    pub fn next(&self) -> bool {
        self.navigate(SlideCarousel::next)
    }

    /// Previous slide, wrapping.
    pub fn prev(&self) -> bool {
        self.navigate(SlideCarousel::prev)
    }

    fn navigate(&self, step: impl FnOnce(&mut SlideCarousel<GalleryImage>) -> bool) -> bool {
        let mut state = self.inner.state.lock();
        state.cancel_rotation();
        let moved = step(&mut state.carousel);
        if moved {
            self.inner.render(&state);
        }
        self.inner.restart_rotation(&mut state);
        moved
    }

    /// Pointer entered (`true`) or left (`false`) the carousel.
    pub fn hover(&self, inside: bool) {
        let mut state = self.inner.state.lock();
        state.hovering = inside;
        if inside {
            state.cancel_rotation();
            debug!(widget = "gallery", "auto-advance paused on hover");
        } else {
            self.inner.restart_rotation(&mut state);
        }
    }

    /// Open the lightbox on the current slide.
    pub fn open_lightbox(&self) -> bool {
        let mut state = self.inner.state.lock();
        let Some(image) = state.carousel.current().cloned() else {
            return false;
        };
        state.lightbox.open(&image.url, &image.title);
        self.inner.render_lightbox(&state);
        true
    }

    /// Click inside the lightbox; returns `true` if it closed.
    pub fn lightbox_click(&self, target: ClickTarget) -> bool {
        let mut state = self.inner.state.lock();
        let closed = state.lightbox.click(target);
        if closed {
            self.inner.render_lightbox(&state);
        }
        closed
    }

    /// Page-level key press; returns `true` if the gallery acted on it.
    pub fn key(&self, key: Key) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.lightbox.key(key) {
                self.inner.render_lightbox(&state);
                return true;
            }
            if state.lightbox.is_active() {
                return false;
            }
        }
        match key {
            Key::ArrowLeft => self.prev(),
            Key::ArrowRight => self.next(),
            Key::Escape => false,
        }
    }

    /// Index of the shown slide.
    pub fn index(&self) -> usize {
        self.inner.state.lock().carousel.index()
    }

    /// Number of slides.
    pub fn len(&self) -> usize {
        self.inner.state.lock().carousel.len()
    }

    /// Whether there are no slides.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether auto-advance is scheduled.
    pub fn is_rotating(&self) -> bool {
        self.inner
            .state
            .lock()
            .rotation
            .as_ref()
            .is_some_and(TaskHandle::is_running)
    }

    /// Whether the lightbox is showing.
    pub fn lightbox_open(&self) -> bool {
        self.inner.state.lock().lightbox.is_active()
    }

    /// Stop auto-advance for good (page teardown).
    pub fn stop(&self) {
        self.inner.state.lock().cancel_rotation();
    }
}

impl GalleryInner {
    fn render(&self, state: &GalleryState) {
        let carousel = &state.carousel;
        self.targets.gallery.replace(render_slide(carousel.current()));
        if let Some(dots) = &self.targets.dots {
            dots.replace(render_dots(carousel.len(), carousel.index()));
        }
        if let Some(nav) = &self.targets.nav {
            nav.replace(render_nav(carousel.len()));
        }
        metrics::inc_render("gallery");
    }

    fn render_lightbox(&self, state: &GalleryState) {
        if let Some(slot) = &self.targets.lightbox {
            slot.replace(state.lightbox.render());
        }
    }

    fn restart_rotation(self: &Arc<Self>, state: &mut GalleryState) {
        state.cancel_rotation();
        if !self.settings.auto_advance || state.hovering || state.carousel.len() <= 1 {
            return;
        }
        let generation = state.rotation_generation;
        let weak: Weak<Self> = Arc::downgrade(self);
        state.rotation = Some(spawn_repeating(
            "gallery-rotation",
            self.settings.rotation_delay,
            move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.advance(generation);
                    }
                }
            },
        ));
    }

    /// Rotation tick. A tick from a cancelled schedule that was already
    /// waiting on the lock is dropped.
    fn advance(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.rotation_generation != generation {
            debug!(widget = "gallery", "stale rotation tick dropped");
            return;
        }
        if state.carousel.next() {
            self.render(&state);
        }
    }
}

#[async_trait]
impl PollWidget for GalleryWidget {
    fn name(&self) -> &'static str {
        "gallery"
    }

    async fn refresh(&self) {
        let inner = &self.inner;
        let images = match inner
            .fetcher
            .get_json::<ImageSearch>(&inner.settings.endpoint)
            .await
        {
            Ok(search) => extract_images(&search, inner.settings.max_items),
            Err(e) => {
                warn!(widget = "gallery", error = %e, "image search failed");
                Vec::new()
            }
        };

        if images.is_empty() {
            let fallback = inner.fallback.fallback_images();
            info!(widget = "gallery", count = fallback.len(), "showing static images");
            metrics::inc_fallback("gallery");
            self.show(fallback);
        } else {
            info!(widget = "gallery", count = images.len(), "gallery refreshed");
            self.show(images);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::mission::MissionDocument;

    fn image(n: usize) -> GalleryImage {
        GalleryImage {
            url: format!("https://images.example.org/{n}.jpg"),
            title: format!("Image {n}"),
            description: String::new(),
        }
    }

    fn widget(doc: &Document, rotation_ms: u64, auto_advance: bool) -> GalleryWidget {
        let settings = GallerySettings {
            endpoint: Endpoint::new(
                "gallery",
                reqwest::Url::parse("http://127.0.0.1:9/search").expect("test: url"),
            ),
            max_items: 8,
            rotation_delay: Duration::from_millis(rotation_ms),
            auto_advance,
        };
        let targets = GalleryTargets::claim(doc).expect("test: gallery slot declared");
        GalleryWidget::new(Fetcher::default(), settings, targets, MissionHandle::default())
    }

    fn doc() -> Document {
        Document::with_slots([slots::GALLERY, slots::DOTS, slots::NAV, slots::LIGHTBOX])
    }

    #[test]
    fn test_extract_images_filters_and_defaults() {
        let search: ImageSearch = serde_json::from_value(serde_json::json!({
            "collection": {"items": [
                {"links": [], "data": [{"title": "no link"}]},
                {"links": [{"href": "https://images.example.org/a.jpg"}], "data": []},
                {"links": [{"href": "https://images.example.org/b.jpg"}],
                 "data": [{"title": "Orion", "description": "x".repeat(150)}]}
            ]}
        }))
        .expect("test: decodes");
        let images = extract_images(&search, 8);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].title, DEFAULT_TITLE);
        assert_eq!(images[1].title, "Orion");
        assert_eq!(images[1].description.chars().count(), DESCRIPTION_CHARS);
    }

    #[test]
    fn test_extract_images_tolerates_null_lists() {
        let search: ImageSearch = serde_json::from_value(serde_json::json!({
            "collection": {"items": [
                {"links": null, "data": null},
                {"links": [{"href": "https://images.example.org/c.jpg"}], "data": null}
            ]}
        }))
        .expect("test: decodes");
        let images = extract_images(&search, 8);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].title, DEFAULT_TITLE);

        let empty: ImageSearch =
            serde_json::from_value(serde_json::json!({"collection": null})).expect("test: decodes");
        assert!(extract_images(&empty, 8).is_empty());
    }

    #[test]
    fn test_extract_images_bounded() {
        let items: Vec<_> = (0..20)
            .map(|n| serde_json::json!({"links": [{"href": format!("https://i/{n}")}]}))
            .collect();
        let search: ImageSearch =
            serde_json::from_value(serde_json::json!({"collection": {"items": items}}))
                .expect("test: decodes");
        assert_eq!(extract_images(&search, 8).len(), 8);
    }

    #[test]
    fn test_render_dots_marks_current() {
        let html = render_dots(3, 1);
        assert_eq!(html.matches("carousel-dot active").count(), 1);
        assert!(html.contains("Go to image 3"));
    }

    #[test]
    fn test_render_nav_disabled_for_single_image() {
        assert!(render_nav(1).contains("disabled"));
        assert!(!render_nav(2).contains("disabled"));
    }

    #[test]
    fn test_render_slide_guards_url() {
        let html = render_slide(Some(&GalleryImage {
            url: "javascript:alert(1)".into(),
            title: "<t>".into(),
            description: String::new(),
        }));
        assert!(html.contains(r#"src="""#));
        assert!(html.contains("&lt;t&gt;"));
        assert_eq!(render_slide(None), EMPTY_GALLERY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_wraps() {
        let doc = doc();
        let gallery = widget(&doc, 6_000, true);
        gallery.show((0..3).map(image).collect());
        assert!(gallery.is_rotating());

        tokio::time::sleep(Duration::from_millis(6_010)).await;
        assert_eq!(gallery.index(), 1);
        tokio::time::sleep(Duration::from_millis(12_000)).await;
        assert_eq!(gallery.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_restarts_rotation_period() {
        let doc = doc();
        let gallery = widget(&doc, 6_000, true);
        gallery.show((0..5).map(image).collect());

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert!(gallery.go_to(3));
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(gallery.index(), 3, "period restarted by navigation");
        tokio::time::sleep(Duration::from_millis(1_010)).await;
        assert_eq!(gallery.index(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_from_cancelled_rotation_is_dropped() {
        let doc = doc();
        let gallery = widget(&doc, 6_000, true);
        gallery.show((0..3).map(image).collect());
        let before = gallery.inner.state.lock().rotation_generation;

        assert!(gallery.go_to(2));
        gallery.inner.advance(before);
        assert_eq!(gallery.index(), 2);

        let current = gallery.inner.state.lock().rotation_generation;
        gallery.inner.advance(current);
        assert_eq!(gallery.index(), 0);

        gallery.hover(true);
        gallery.inner.advance(current);
        assert_eq!(gallery.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_pauses_and_resumes() {
        let doc = doc();
        let gallery = widget(&doc, 1_000, true);
        gallery.show((0..3).map(image).collect());

        gallery.hover(true);
        assert!(!gallery.is_rotating());
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(gallery.index(), 0);

        gallery.hover(false);
        assert!(gallery.is_rotating());
        tokio::time::sleep(Duration::from_millis(1_010)).await;
        assert_eq!(gallery.index(), 1);
    }

    #[tokio::test]
    async fn test_single_image_never_rotates() {
        let doc = doc();
        let gallery = widget(&doc, 1_000, true);
        gallery.show(vec![image(0)]);
        assert!(!gallery.is_rotating());
        assert!(doc.fragment(slots::NAV).unwrap_or_default().contains("disabled"));
    }

    #[tokio::test]
    async fn test_empty_gallery_renders_message() {
        let doc = doc();
        let gallery = widget(&doc, 1_000, true);
        gallery.show(Vec::new());
        assert!(gallery.is_empty());
        assert_eq!(doc.fragment(slots::GALLERY).as_deref(), Some(EMPTY_GALLERY));
    }

    #[tokio::test]
    async fn test_arrow_keys_ignored_while_lightbox_open() {
        let doc = doc();
        let gallery = widget(&doc, 1_000, false);
        gallery.show((0..3).map(image).collect());

        assert!(gallery.key(Key::ArrowRight));
        assert_eq!(gallery.index(), 1);

        assert!(gallery.open_lightbox());
        assert!(doc
            .fragment(slots::LIGHTBOX)
            .unwrap_or_default()
            .contains("Image 1"));
        assert!(!gallery.key(Key::ArrowRight));
        assert_eq!(gallery.index(), 1);

        assert!(gallery.key(Key::Escape));
        assert!(!gallery.lightbox_open());
        assert!(gallery.key(Key::ArrowLeft));
        assert_eq!(gallery.index(), 0);
    }

    #[tokio::test]
    async fn test_lightbox_image_click_keeps_it_open() {
        let doc = doc();
        let gallery = widget(&doc, 1_000, false);
        gallery.show(vec![image(0)]);
        gallery.open_lightbox();
        assert!(!gallery.lightbox_click(ClickTarget::Image));
        assert!(gallery.lightbox_click(ClickTarget::Backdrop));
        assert!(!gallery.lightbox_open());
    }

    #[tokio::test]
    async fn test_refresh_failure_uses_mission_fallback() {
        let doc = doc();
        let settings = GallerySettings {
            endpoint: Endpoint::new(
                "gallery",
                reqwest::Url::parse("http://127.0.0.1:9/search").expect("test: url"),
            )
            .with_retry(crate::fetch::RetryPolicy::once()),
            max_items: 8,
            rotation_delay: Duration::from_millis(6_000),
            auto_advance: false,
        };
        let fallback = MissionHandle::with_document(MissionDocument {
            fallback_images: vec![image(7), image(8)],
            ..MissionDocument::default()
        });
        let targets = GalleryTargets::claim(&doc).expect("test: declared");
        let gallery = GalleryWidget::new(Fetcher::default(), settings, targets, fallback);

        gallery.refresh().await;
        assert_eq!(gallery.len(), 2);
        assert!(doc.fragment(slots::GALLERY).unwrap_or_default().contains("Image 7"));
    }
}
