//! # Widget: News Strip
//!
//! Horizontally scrolled article cards from the news search, falling back to
//! the mission document's static articles. Off unless `news.enabled` is set.

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ConfigError, DeckConfig};
use crate::fetch::{Endpoint, Fetcher};
use crate::metrics;
use crate::sanitize::{escape_html, sanitize_url};
use crate::view::{Document, Slot};
use crate::widgets::carousel::StripCarousel;
use crate::widgets::mission::MissionHandle;
use crate::widgets::{PollWidget, PLACEHOLDER};

/// Slot names this widget writes.
pub mod slots {
    /// Article strip. Required.
    pub const STRIP: &str = "news-carousel";
    /// Prev/next buttons.
    pub const NAV: &str = "news-nav";
}

/// A displayable article, as the mission document stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsItem {
    /// Headline.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub title: String,
    /// Teaser.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub summary: String,
    /// Lead image.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub image_url: String,
    /// Canonical article URL.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub url: String,
    /// Publisher.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub source: String,
    /// Publish instant, RFC 3339.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub date: String,
}

/// News-search response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsSearch {
    /// Matching articles.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub results: Vec<ArticleRecord>,
}

/// One article as the news provider returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleRecord {
    /// Headline.
    pub title: Option<String>,
    /// Teaser.
    pub summary: Option<String>,
    /// Lead image.
    pub image_url: Option<String>,
    /// Canonical URL.
    pub url: Option<String>,
    /// Publisher.
    pub news_site: Option<String>,
    /// Publish instant.
    pub published_at: Option<String>,
}

impl From<&ArticleRecord> for NewsItem {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            title: record.title.clone().unwrap_or_default(),
            summary: record.summary.clone().unwrap_or_default(),
            image_url: record.image_url.clone().unwrap_or_default(),
            url: record.url.clone().unwrap_or_default(),
            source: record.news_site.clone().unwrap_or_default(),
            date: record.published_at.clone().unwrap_or_default(),
        }
    }
}

/// `Jan 5, 2026`, or the placeholder for anything unparseable.
pub fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| PLACEHOLDER.to_string())
}

fn render_card(item: &NewsItem) -> String {
    let title = escape_html(&item.title);
    let image_url = sanitize_url(&item.image_url);
    let image = if image_url.is_empty() {
        r#"<div class="article-image placeholder" role="img" aria-label="Image unavailable">IMAGE UNAVAILABLE</div>"#.to_string()
    } else {
        format!(r#"<img class="article-image" src="{image_url}" alt="{title}" loading="lazy">"#)
    };
    format!(
        r#"<article class="news-article"><a href="{href}" target="_blank" rel="noopener noreferrer">{image}<div class="article-content"><h3 class="article-title">{title}</h3><p class="article-summary">{summary}</p><div class="article-meta"><span>{source}</span><span>{date}</span></div></div></a></article>"#,
        href = sanitize_url(&item.url),
        summary = escape_html(&item.summary),
        source = escape_html(&item.source),
        date = format_date(&item.date),
    )
}

fn render_strip(items: &[NewsItem], strip: &StripCarousel) -> String {
    let cards: String = items.iter().map(render_card).collect();
    format!(
        r#"<div class="news-strip" data-strip-index="{i}" style="--strip-index:{i}">{cards}</div>"#,
        i = strip.index()
    )
}

fn render_nav(strip: &StripCarousel) -> String {
    let attr = |enabled: bool| if enabled { "" } else { " disabled" };
    format!(
        r#"<button class="carousel-nav prev" aria-label="Previous articles" data-news-nav="prev"{}>&#8249;</button><button class="carousel-nav next" aria-label="Next articles" data-news-nav="next"{}>&#8250;</button>"#,
        attr(strip.can_prev()),
        attr(strip.can_next()),
    )
}

/// Endpoint and bounds.
#[derive(Debug, Clone)]
pub struct NewsSettings {
    /// News search.
    pub endpoint: Endpoint,
    /// Articles kept per fetch.
    pub max_items: usize,
}

impl NewsSettings {
    /// Settings from the `[news]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint URL does not resolve.
    pub fn from_config(config: &DeckConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: config.news_endpoint()?,
            max_items: config.news.max_items,
        })
    }
}

/// View targets.
#[derive(Debug)]
pub struct NewsTargets {
    strip: Slot,
    nav: Option<Slot>,
}

impl NewsTargets {
    /// Claim the news slots; `None` without a strip slot.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            strip: doc.claim(slots::STRIP)?,
            nav: doc.claim(slots::NAV),
        })
    }
}

#[derive(Debug, Default)]
struct NewsState {
    items: Vec<NewsItem>,
    strip: StripCarousel,
}

/// Scrollable article strip.
#[derive(Debug)]
pub struct NewsWidget {
    fetcher: Fetcher,
    settings: NewsSettings,
    targets: NewsTargets,
    fallback: MissionHandle,
    state: Mutex<NewsState>,
}

impl NewsWidget {
    /// Build the widget; articles arrive with the first refresh.
    pub fn new(
        fetcher: Fetcher,
        settings: NewsSettings,
        targets: NewsTargets,
        fallback: MissionHandle,
    ) -> Self {
        Self {
            fetcher,
            settings,
            targets,
            fallback,
            state: Mutex::new(NewsState::default()),
        }
    }

    /// Replace the articles and scroll back to the start.
    pub fn show(&self, items: Vec<NewsItem>) {
        let mut state = self.state.lock();
        state.strip.reset(items.len());
        state.items = items;
        self.render(&state);
    }

    /// Scroll one card forward.
    pub fn next(&self) -> bool {
        let mut state = self.state.lock();
        let moved = state.strip.next();
        if moved {
            self.render(&state);
        }
        moved
    }

    /// Scroll one card back.
    pub fn prev(&self) -> bool {
        let mut state = self.state.lock();
        let moved = state.strip.prev();
        if moved {
            self.render(&state);
        }
        moved
    }

    /// Leftmost visible card.
    pub fn index(&self) -> usize {
        self.state.lock().strip.index()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the strip is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn render(&self, state: &NewsState) {
        self.targets
            .strip
            .replace(render_strip(&state.items, &state.strip));
        if let Some(nav) = &self.targets.nav {
            nav.replace(render_nav(&state.strip));
        }
        metrics::inc_render("news");
    }
}

#[async_trait]
impl PollWidget for NewsWidget {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn refresh(&self) {
        let items: Vec<NewsItem> = match self
            .fetcher
            .get_json::<NewsSearch>(&self.settings.endpoint)
            .await
        {
            Ok(search) => search
                .results
                .iter()
                .take(self.settings.max_items)
                .map(NewsItem::from)
                .collect(),
            Err(e) => {
                warn!(widget = "news", error = %e, "news search failed");
                Vec::new()
            }
        };

        if items.is_empty() {
            let fallback = self.fallback.fallback_news();
            info!(widget = "news", count = fallback.len(), "showing static articles");
            metrics::inc_fallback("news");
            self.show(fallback);
        } else {
            info!(widget = "news", count = items.len(), "news refreshed");
            self.show(items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> NewsItem {
        NewsItem {
            title: format!("Story {n}"),
            summary: "Summary".into(),
            image_url: String::new(),
            url: format!("https://news.example.org/{n}"),
            source: "Example Wire".into(),
            date: "2026-01-05T10:00:00Z".into(),
        }
    }

    fn widget(doc: &Document) -> NewsWidget {
        let settings = NewsSettings {
            endpoint: Endpoint::new(
                "news",
                reqwest::Url::parse("http://127.0.0.1:9/news").expect("test: url"),
            ),
            max_items: 6,
        };
        let targets = NewsTargets::claim(doc).expect("test: declared");
        NewsWidget::new(Fetcher::default(), settings, targets, MissionHandle::default())
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-01-05T10:00:00Z"), "Jan 5, 2026");
        assert_eq!(format_date("soon"), PLACEHOLDER);
    }

    #[test]
    fn test_card_placeholder_and_escaping() {
        let mut news = item(1);
        news.title = "<script>alert(1)</script>".into();
        news.image_url = "data:image/png;base64,AAAA".into();
        news.url = "javascript:alert(1)".into();
        let html = render_card(&news);
        assert!(html.contains("IMAGE UNAVAILABLE"));
        assert!(html.contains(r#"href="""#));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_record_maps_provider_fields() {
        let search: NewsSearch = serde_json::from_str(
            r#"{"results":[{"title":"T","news_site":"Wire","image_url":"https://i/x.jpg","published_at":"2026-01-05T00:00:00Z"}]}"#,
        )
        .expect("test: decodes");
        let mapped = NewsItem::from(&search.results[0]);
        assert_eq!(mapped.source, "Wire");
        assert_eq!(mapped.image_url, "https://i/x.jpg");
        assert_eq!(mapped.summary, "");
    }

    #[test]
    fn test_strip_navigation_bounds() {
        let doc = Document::with_slots([slots::STRIP, slots::NAV]);
        let news = widget(&doc);
        news.show((0..6).map(item).collect());

        assert!(!news.prev());
        assert!(doc.fragment(slots::NAV).unwrap_or_default().contains(r#""prev" disabled"#));
        for _ in 0..10 {
            news.next();
        }
        assert_eq!(news.index(), 4);
        assert!(doc.fragment(slots::NAV).unwrap_or_default().contains(r#""next" disabled"#));
    }

    #[test]
    fn test_show_resets_position() {
        let doc = Document::with_slots([slots::STRIP]);
        let news = widget(&doc);
        news.show((0..6).map(item).collect());
        news.next();
        news.show((0..3).map(item).collect());
        assert_eq!(news.index(), 0);
        assert_eq!(news.len(), 3);
    }
}
