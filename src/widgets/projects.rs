//! # Widget: Project Showcase
//!
//! Loads the projects document once and renders one card per project.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{ConfigError, DeckConfig};
use crate::fetch::{Endpoint, Fetcher};
use crate::metrics;
use crate::sanitize::{escape_html, sanitize_url};
use crate::view::{Document, Slot};
use crate::widgets::PollWidget;

/// Slot names this widget writes.
pub mod slots {
    /// Card grid. Required.
    pub const GRID: &str = "project-grid";
    /// Inline failure message.
    pub const ERROR: &str = "project-error";
}

/// Card shown when the document lists nothing.
pub const EMPTY_CARD: &str = r#"<div class="card" style="grid-column: span 12"><h3>NO PROJECTS</h3><p>Add entries to <code>/projects.json</code>.</p></div>"#;

/// The projects document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectsDocument {
    /// Projects in display order.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub projects: Vec<Project>,
}

/// One showcased project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Title; `PROJECT` when absent.
    pub title: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Tag chips.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub tags: Vec<String>,
    /// Link target; no link is rendered when it fails the URL guard.
    pub url: Option<String>,
}

fn render_card(project: &Project) -> String {
    let tags: String = project
        .tags
        .iter()
        .map(|t| format!("<span>{}</span>", escape_html(t)))
        .collect();
    let href = sanitize_url(project.url.as_deref().unwrap_or_default());
    let link = if href.is_empty() {
        String::new()
    } else {
        format!(r#"<a class="btn" style="margin-top:12px" href="{href}" target="_blank" rel="noreferrer">OPEN</a>"#)
    };
    let title = project
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("PROJECT");
    format!(
        r#"<article class="card"><h3>{title}</h3><p>{desc}</p><div class="kv">{tags}</div>{link}</article>"#,
        title = escape_html(title),
        desc = escape_html(project.description.as_deref().unwrap_or_default()),
    )
}

/// Grid markup for `doc`.
pub fn render_projects(doc: &ProjectsDocument) -> String {
    if doc.projects.is_empty() {
        return EMPTY_CARD.to_string();
    }
    doc.projects.iter().map(render_card).collect()
}

/// View targets.
#[derive(Debug)]
pub struct ProjectsTargets {
    grid: Slot,
    error: Option<Slot>,
}

impl ProjectsTargets {
    /// Claim the project slots; `None` without a grid slot.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            grid: doc.claim(slots::GRID)?,
            error: doc.claim(slots::ERROR),
        })
    }
}

/// Project card grid.
#[derive(Debug)]
pub struct ProjectsWidget {
    fetcher: Fetcher,
    endpoint: Endpoint,
    targets: ProjectsTargets,
}

impl ProjectsWidget {
    /// Build the widget against `endpoint`.
    pub fn new(fetcher: Fetcher, endpoint: Endpoint, targets: ProjectsTargets) -> Self {
        Self {
            fetcher,
            endpoint,
            targets,
        }
    }

    /// Build the widget from the `[projects]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint URL does not resolve.
    pub fn from_config(
        config: &DeckConfig,
        fetcher: Fetcher,
        targets: ProjectsTargets,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(fetcher, config.projects_endpoint()?, targets))
    }
}

#[async_trait]
impl PollWidget for ProjectsWidget {
    fn name(&self) -> &'static str {
        "projects"
    }

    async fn refresh(&self) {
        if let Some(err) = &self.targets.error {
            err.clear();
        }
        match self
            .fetcher
            .get_json::<ProjectsDocument>(&self.endpoint)
            .await
        {
            Ok(doc) => {
                self.targets.grid.replace(render_projects(&doc));
                metrics::inc_render("projects");
                info!(widget = "projects", count = doc.projects.len(), "projects rendered");
            }
            Err(e) => {
                warn!(widget = "projects", error = %e, "projects fetch failed");
                if let Some(err) = &self.targets.error {
                    err.set_text(&format!("Projects feed offline ({e})."));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: serde_json::Value) -> ProjectsDocument {
        serde_json::from_value(json).expect("test: projects decode")
    }

    #[test]
    fn test_empty_document_renders_empty_card() {
        assert_eq!(render_projects(&ProjectsDocument::default()), EMPTY_CARD);
        assert_eq!(render_projects(&doc(serde_json::json!({}))), EMPTY_CARD);
    }

    #[test]
    fn test_card_defaults_title_and_omits_unsafe_link() {
        let html = render_projects(&doc(serde_json::json!({
            "projects": [{"description": "Relay", "tags": ["rust", "<b>"], "url": "JavaScript:alert(1)"}]
        })));
        assert!(html.contains("<h3>PROJECT</h3>"));
        assert!(html.contains("<span>&lt;b&gt;</span>"));
        assert!(!html.contains("OPEN"));
    }

    #[test]
    fn test_card_with_safe_link() {
        let html = render_projects(&doc(serde_json::json!({
            "projects": [{"title": "Deck", "url": " https://example.com/x?a=1&b=2 "}]
        })));
        assert!(html.contains(r#"href="https://example.com/x?a=1&amp;b=2""#));
        assert!(html.contains(">OPEN</a>"));
    }

    #[test]
    fn test_null_tags_and_projects_decode_as_empty() {
        let html = render_projects(&doc(serde_json::json!({
            "projects": [{"title": "Relay", "tags": null}]
        })));
        assert!(html.contains("<h3>Relay</h3>"));
        assert!(html.contains(r#"<div class="kv"></div>"#));

        assert_eq!(render_projects(&doc(serde_json::json!({"projects": null}))), EMPTY_CARD);
    }
}
