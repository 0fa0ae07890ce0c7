//! # Stage: Declarative Dashboard Configuration
//!
//! ## Responsibility
//! Parse and validate the TOML file that names every endpoint, polling
//! interval, retry ceiling and widget option. Run the dashboard with:
//! ```text
//! mission-deck --config deck.toml
//! ```
//!
//! ## Guarantees
//! - Every field has a documented default; an empty file is a valid config
//! - Validated: all semantic constraints are checked before a config is accepted
//! - Relative endpoint URLs are resolved against `sources.base_url`
//! - Schema-exportable: JSON Schema output enables editor completion
//!
//! ## NOT Responsible For
//! - Fetching anything (that belongs to `fetch`)
//! - Constructing widgets (that belongs to `main`/`server`)

pub mod loader;
pub mod validation;

use std::time::Duration;

use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fetch::{Endpoint, RetryPolicy};
pub use validation::ConfigError;

// ── Top-level config ─────────────────────────────────────────────────────

/// Root configuration for a dashboard instance.
///
/// # Example
///
/// ```toml
/// [sources]
/// base_url = "https://armory.example.net/"
///
/// [gallery]
/// rotation_delay_ms = 8000
///
/// [news]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DeckConfig {
    /// HTTP surface of the binary.
    pub server: ServerConfig,
    /// Where relative endpoint URLs resolve and how the HTTP client behaves.
    pub sources: SourcesConfig,
    /// Retry ceiling and backoff shared by every retrying endpoint.
    pub retry: RetryConfig,
    /// Mission countdown and timeline.
    pub mission: MissionConfig,
    /// Single-slide image gallery.
    pub gallery: GalleryConfig,
    /// News strip (disabled by default).
    pub news: NewsConfig,
    /// Host telemetry panel.
    pub telemetry: TelemetryConfig,
    /// Project showcase.
    pub projects: ProjectsConfig,
    /// Embedded frame height sync.
    pub frame: FrameConfig,
    /// Decorative background.
    pub starfield: StarfieldConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Origin accepted for frame-size messages. Defaults to
    /// `http://localhost:<port>`.
    pub origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            origin: None,
        }
    }
}

impl ServerConfig {
    /// The origin frame-size messages must come from.
    pub fn expected_origin(&self) -> String {
        self.origin
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

/// Upstream resolution and client timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Base for relative endpoint URLs (author-controlled JSON documents).
    pub base_url: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Retry policy for endpoints that retry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per fetch, first one included.
    pub attempts: usize,
    /// Backoff base in milliseconds; waits are `base * 2^n`.
    pub base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_ms: 1_000,
        }
    }
}

impl RetryConfig {
    /// The configured policy.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.attempts, Duration::from_millis(self.base_ms))
    }
}

/// Mission countdown settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct MissionConfig {
    /// Whether the mission widget runs.
    pub enabled: bool,
    /// Mission configuration document.
    pub config_url: String,
    /// Launch-schedule search endpoint.
    pub launch_schedule_url: String,
    /// Accepted launch-name variants (case-insensitive substring match).
    pub launch_names: Vec<String>,
    /// RFC 3339 launch instant used when nothing better is known.
    pub fallback_launch: String,
    /// Countdown tick in milliseconds.
    pub countdown_interval_ms: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            config_url: "artemis.json".to_string(),
            launch_schedule_url:
                "https://ll.thespacedevs.com/2.2.0/launch/upcoming/?search=artemis&limit=5"
                    .to_string(),
            launch_names: vec!["artemis ii".to_string(), "artemis 2".to_string()],
            fallback_launch: "2026-09-01T12:00:00Z".to_string(),
            countdown_interval_ms: 1_000,
        }
    }
}

/// Gallery carousel settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct GalleryConfig {
    /// Whether the gallery widget runs.
    pub enabled: bool,
    /// Image-search endpoint.
    pub url: String,
    /// Re-fetch interval in milliseconds.
    pub interval_ms: u64,
    /// Maximum slides kept from a fetch.
    pub max_items: usize,
    /// Auto-advance period in milliseconds.
    pub rotation_delay_ms: u64,
    /// Whether slides advance on their own.
    pub auto_advance: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://images-api.nasa.gov/search?q=artemis%20moon%20mission&media_type=image"
                .to_string(),
            interval_ms: 3_600_000,
            max_items: 8,
            rotation_delay_ms: 6_000,
            auto_advance: true,
        }
    }
}

/// News strip settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct NewsConfig {
    /// Whether the news widget runs. Off unless asked for.
    pub enabled: bool,
    /// News-search endpoint.
    pub url: String,
    /// Re-fetch interval in milliseconds.
    pub interval_ms: u64,
    /// Maximum articles kept from a fetch.
    pub max_items: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://api.spaceflightnewsapi.net/v4/articles/?search=artemis&limit=6"
                .to_string(),
            interval_ms: 900_000,
            max_items: 6,
        }
    }
}

/// Telemetry panel settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether the telemetry widget runs.
    pub enabled: bool,
    /// Snapshot endpoint.
    pub url: String,
    /// Re-fetch interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "telemetry.json".to_string(),
            interval_ms: 5_000,
        }
    }
}

/// Project showcase settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ProjectsConfig {
    /// Whether the projects widget runs.
    pub enabled: bool,
    /// Projects document.
    pub url: String,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "projects.json".to_string(),
        }
    }
}

/// Embedded frame height sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// Whether frame-size messages are accepted.
    pub enabled: bool,
    /// Value of the message `type` field.
    pub marker: String,
    /// Identifier of the embedded frame.
    pub frame_id: String,
    /// Smallest height applied, in pixels.
    pub min_height: u32,
    /// Largest height applied, in pixels.
    pub max_height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker: "MJ_IFRAME_SIZE".to_string(),
            frame_id: "module-frame".to_string(),
            min_height: 640,
            max_height: 2_200,
        }
    }
}

/// Starfield settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct StarfieldConfig {
    /// Points seeded per resize.
    pub star_count: usize,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self { star_count: 170 }
    }
}

// ── Endpoint resolution ──────────────────────────────────────────────────

impl DeckConfig {
    /// Resolve `url` against `sources.base_url` when it is relative.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming `field` if neither the URL
    /// nor the base parses.
    pub fn resolve_url(&self, field: &str, url: &str) -> Result<Url, ConfigError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        Url::parse(&self.sources.base_url)
            .and_then(|base| base.join(url))
            .map_err(|e| ConfigError::InvalidField {
                field: field.to_string(),
                value: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Mission configuration document (retrying, fetched once).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn mission_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new("mission", self.resolve_url("mission.config_url", &self.mission.config_url)?)
            .with_retry(self.retry.policy()))
    }

    /// Launch-schedule lookup (retrying, best effort).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn launch_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new(
            "launch_schedule",
            self.resolve_url("mission.launch_schedule_url", &self.mission.launch_schedule_url)?,
        )
        .with_retry(self.retry.policy()))
    }

    /// Image search (retrying, hourly).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn gallery_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new("gallery", self.resolve_url("gallery.url", &self.gallery.url)?)
            .with_interval(Duration::from_millis(self.gallery.interval_ms))
            .with_retry(self.retry.policy()))
    }

    /// News search (retrying).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn news_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new("news", self.resolve_url("news.url", &self.news.url)?)
            .with_interval(Duration::from_millis(self.news.interval_ms))
            .with_retry(self.retry.policy()))
    }

    /// Telemetry snapshot (single attempt, uncached, every few seconds).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn telemetry_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new("telemetry", self.resolve_url("telemetry.url", &self.telemetry.url)?)
            .with_interval(Duration::from_millis(self.telemetry.interval_ms))
            .with_retry(RetryPolicy::once())
            .no_store())
    }

    /// Projects document (single attempt, uncached, fetched once).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL cannot be resolved.
    pub fn projects_endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new("projects", self.resolve_url("projects.url", &self.projects.url)?)
            .with_retry(RetryPolicy::once())
            .no_store())
    }
}

/// Export the JSON Schema of [`DeckConfig`].
///
/// # Errors
///
/// Returns `serde_json::Error` if schema serialization fails.
pub fn export_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(DeckConfig);
    serde_json::to_string_pretty(&schema)
}
