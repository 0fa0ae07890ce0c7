//! # Widget: Mission Countdown & Timeline
//!
//! ## Responsibility
//! Load the mission configuration document, render the status panel and
//! milestone timeline, keep the launch instant fresh from the launch-schedule
//! provider, and tick the countdown once per second.
//!
//! ## Guarantees
//! - A launch instant is always known: the document's, else the configured
//!   fallback; a provider match overrides either
//! - Provider lookup failures are swallowed; the previous instant stays
//! - Milestone statuses are recomputed on every tick from elapsed time and
//!   always form a completed prefix, at most one active, and a pending suffix
//! - The loaded document is shared read-only with the gallery and news
//!   widgets as their static fallback collections
//!
//! ## NOT Responsible For
//! - Rendering the fallback collections (the owning widgets do)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DeckConfig};
use crate::fetch::{Endpoint, Fetcher};
use crate::metrics;
use crate::sanitize::escape_html;
use crate::schedule::{spawn_detached, spawn_repeating, TaskHandle};
use crate::view::{Document, Slot};
use crate::widgets::gallery::GalleryImage;
use crate::widgets::news::NewsItem;
use crate::widgets::{text_or_placeholder, PLACEHOLDER};

/// Slot names this widget writes.
pub mod slots {
    /// Countdown digits. Required.
    pub const COUNTDOWN: &str = "countdown";
    /// Header status pill.
    pub const STATUS_PILL: &str = "mission-status-pill";
    /// `Launch: …` line.
    pub const LAUNCH_DATE: &str = "launch-date";
    /// Launch site line.
    pub const LAUNCH_SITE: &str = "launch-site";
    /// Milestone list.
    pub const TIMELINE: &str = "timeline";
    /// Status/vehicle/crew grid.
    pub const STATUS_PANEL: &str = "mission-status";
}

// ── Records ────────────────────────────────────────────────────────────────

/// The author-controlled mission configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissionDocument {
    /// Mission metadata.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub mission: MissionInfo,
    /// Ordered milestone list.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub milestones: Vec<Milestone>,
    /// Articles shown when the news feed is unavailable.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub fallback_news: Vec<NewsItem>,
    /// Images shown when the image search is unavailable.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub fallback_images: Vec<GalleryImage>,
}

/// Mission metadata. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissionInfo {
    /// Current mission status.
    pub status: Option<String>,
    /// Launch vehicle.
    pub vehicle: Option<String>,
    /// Crew capsule.
    pub spacecraft: Option<String>,
    /// Crew size; authors write it as a number or a string.
    pub crew: Option<serde_json::Value>,
    /// Mission duration, free text.
    pub duration: Option<String>,
    /// Destination / landing site.
    pub landing_site: Option<String>,
    /// Launch instant, RFC 3339.
    pub launch_date: Option<String>,
    /// Human launch date shown until the provider supplies a better one.
    pub launch_date_display: Option<String>,
    /// Launch site.
    pub launch_site: Option<String>,
}

/// A named mission event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Milestone {
    /// Stable identifier.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Human offset (e.g. `T+8m`).
    pub time: Option<String>,
    /// Offset from launch in seconds.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub time_seconds: f64,
    /// Tooltip text.
    pub description: Option<String>,
    /// Icon tag.
    pub icon: Option<String>,
}

/// Launch-schedule search result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaunchSearch {
    /// Upcoming launches.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub results: Vec<LaunchRecord>,
}

/// One upcoming launch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaunchRecord {
    /// Launch name.
    pub name: Option<String>,
    /// "No earlier than" instant.
    pub net: Option<String>,
    /// Provider status.
    pub status: Option<LaunchStatus>,
}

/// Provider launch status.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaunchStatus {
    /// Status name (e.g. `Go for Launch`).
    pub name: Option<String>,
}

// ── Countdown ──────────────────────────────────────────────────────────────

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Distance to (or since) launch, decomposed for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Whole days, unclamped.
    pub days: u64,
    /// Hours within the day.
    pub hours: u64,
    /// Minutes within the hour.
    pub minutes: u64,
    /// Seconds within the minute.
    pub seconds: u64,
    /// Launch is in the past.
    pub elapsed: bool,
    abs_ms: u64,
}

impl Countdown {
    /// Decompose an absolute millisecond distance.
    pub fn from_millis(abs_ms: u64, elapsed: bool) -> Self {
        Self {
            days: abs_ms / MS_PER_DAY,
            hours: (abs_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (abs_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (abs_ms % MS_PER_MINUTE) / MS_PER_SECOND,
            elapsed,
            abs_ms,
        }
    }

    /// Countdown from `now` to `launch`.
    pub fn between(launch: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let diff = launch.signed_duration_since(now).num_milliseconds();
        Self::from_millis(diff.unsigned_abs(), diff < 0)
    }

    /// Zero-padded `(days, hours, minutes, seconds)`, widths 3/2/2/2.
    pub fn padded(&self) -> (String, String, String, String) {
        (
            format!("{:03}", self.days),
            format!("{:02}", self.hours),
            format!("{:02}", self.minutes),
            format!("{:02}", self.seconds),
        )
    }

    /// Seconds since launch, or `None` before it.
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.elapsed.then(|| self.abs_ms as f64 / 1000.0)
    }

    fn render(&self) -> String {
        let (d, h, m, s) = self.padded();
        let class = if self.elapsed { "countdown elapsed" } else { "countdown" };
        let unit = |value: &str, label: &str, id: &str| {
            format!(
                r#"<div class="countdown-unit"><span class="countdown-value" id="countdown-{id}">{value}</span><span class="countdown-label">{label}</span></div>"#
            )
        };
        format!(
            r#"<div class="{class}" role="timer">{}{}{}{}</div>"#,
            unit(&d, "DAYS", "days"),
            unit(&h, "HRS", "hours"),
            unit(&m, "MIN", "minutes"),
            unit(&s, "SEC", "seconds"),
        )
    }
}

// ── Milestones ─────────────────────────────────────────────────────────────

/// Derived milestone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    /// Not reached yet.
    Pending,
    /// Reached, and the next one is not.
    Active,
    /// Reached and superseded.
    Complete,
}

impl MilestoneStatus {
    /// Lower-case class/label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Complete => "complete",
        }
    }
}

/// Statuses for ordered `thresholds` (seconds after launch).
///
/// `elapsed` is `None` before launch, which leaves everything pending.
pub fn milestone_statuses(thresholds: &[f64], elapsed: Option<f64>) -> Vec<MilestoneStatus> {
    let Some(elapsed) = elapsed else {
        return vec![MilestoneStatus::Pending; thresholds.len()];
    };
    thresholds
        .iter()
        .enumerate()
        .map(|(i, &threshold)| {
            if elapsed < threshold {
                return MilestoneStatus::Pending;
            }
            match thresholds.get(i + 1) {
                Some(&next) if elapsed >= next => MilestoneStatus::Complete,
                _ => MilestoneStatus::Active,
            }
        })
        .collect()
}

/// Icon for a milestone tag; unknown tags get a plain bullet.
pub fn milestone_icon(tag: Option<&str>) -> &'static str {
    match tag.unwrap_or_default() {
        "rocket" => "\u{1F680}",
        "globe" => "\u{1F30D}",
        "arrow-right" => "\u{27A1}\u{FE0F}",
        "moon" => "\u{1F319}",
        "landing" => "\u{1F6EC}",
        "footprints" => "\u{1F463}",
        "rocket-up" => "\u{2B06}\u{FE0F}",
        "earth" => "\u{1F30E}",
        _ => "\u{25CF}",
    }
}

fn render_timeline(milestones: &[Milestone], elapsed: Option<f64>) -> String {
    let thresholds: Vec<f64> = milestones.iter().map(|m| m.time_seconds).collect();
    milestone_statuses(&thresholds, elapsed)
        .into_iter()
        .zip(milestones)
        .map(|(status, m)| {
            format!(
                r#"<div class="milestone {status}" role="listitem" data-milestone-id="{id}"><div class="milestone-icon">{icon}</div><span class="milestone-name">{name}</span><span class="milestone-time">{time}</span><span class="milestone-status">{status}</span><div class="milestone-tooltip"><p>{desc}</p></div></div>"#,
                status = status.as_str(),
                id = escape_html(m.id.as_deref().unwrap_or_default()),
                icon = milestone_icon(m.icon.as_deref()),
                name = text_or_placeholder(m.name.as_deref()),
                time = text_or_placeholder(m.time.as_deref()),
                desc = escape_html(m.description.as_deref().unwrap_or_default()),
            )
        })
        .collect()
}

// ── Launch lookup ──────────────────────────────────────────────────────────

/// The launch matching one of `names`, with its parsed instant.
///
/// Only the first record whose lower-cased name contains a variant is
/// considered; if that record has no parseable `net`, there is no match.
pub fn find_launch<'a>(
    search: &'a LaunchSearch,
    names: &[String],
) -> Option<(&'a LaunchRecord, DateTime<Utc>)> {
    let record = search.results.iter().find(|launch| {
        launch.name.as_deref().is_some_and(|name| {
            let lower = name.to_lowercase();
            names
                .iter()
                .filter(|variant| !variant.trim().is_empty())
                .any(|variant| lower.contains(&variant.to_lowercase()))
        })
    })?;
    let net = parse_instant(record.net.as_deref()?)?;
    Some((record, net))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn crew_text(crew: Option<&serde_json::Value>) -> String {
    match crew {
        Some(serde_json::Value::Number(n)) => format!("{n} Astronauts"),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
            format!("{} Astronauts", escape_html(s.trim()))
        }
        _ => PLACEHOLDER.to_string(),
    }
}

// ── Shared document handle ─────────────────────────────────────────────────

/// Read-only view of the loaded mission document, shared with the widgets
/// that fall back to its collections.
#[derive(Clone, Debug, Default)]
pub struct MissionHandle {
    inner: Arc<RwLock<Option<Arc<MissionDocument>>>>,
}

impl MissionHandle {
    /// Handle already holding `doc`.
    pub fn with_document(doc: MissionDocument) -> Self {
        let handle = Self::default();
        handle.set(doc);
        handle
    }

    fn set(&self, doc: MissionDocument) {
        *self.inner.write() = Some(Arc::new(doc));
    }

    /// The loaded document, if any.
    pub fn get(&self) -> Option<Arc<MissionDocument>> {
        self.inner.read().clone()
    }

    /// Static gallery images, empty when no document is loaded.
    pub fn fallback_images(&self) -> Vec<GalleryImage> {
        self.get()
            .map(|doc| doc.fallback_images.clone())
            .unwrap_or_default()
    }

    /// Static news articles, empty when no document is loaded.
    pub fn fallback_news(&self) -> Vec<NewsItem> {
        self.get()
            .map(|doc| doc.fallback_news.clone())
            .unwrap_or_default()
    }
}

// ── Widget ─────────────────────────────────────────────────────────────────

/// Endpoints and constants the widget runs with.
#[derive(Debug, Clone)]
pub struct MissionSettings {
    /// Mission configuration document.
    pub mission: Endpoint,
    /// Launch-schedule search.
    pub launch: Endpoint,
    /// Accepted launch-name variants.
    pub names: Vec<String>,
    /// Instant used when nothing better is known.
    pub fallback_launch: DateTime<Utc>,
    /// Countdown tick.
    pub countdown_interval: Duration,
}

impl MissionSettings {
    /// Settings from the `[mission]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an endpoint URL does not resolve or the
    /// fallback instant does not parse.
    pub fn from_config(config: &DeckConfig) -> Result<Self, ConfigError> {
        let fallback_launch = parse_instant(&config.mission.fallback_launch).ok_or_else(|| {
            ConfigError::InvalidField {
                field: "mission.fallback_launch".to_string(),
                value: config.mission.fallback_launch.clone(),
                reason: "must be an RFC 3339 instant".to_string(),
            }
        })?;
        Ok(Self {
            mission: config.mission_endpoint()?,
            launch: config.launch_endpoint()?,
            names: config.mission.launch_names.clone(),
            fallback_launch,
            countdown_interval: Duration::from_millis(config.mission.countdown_interval_ms),
        })
    }
}

/// View targets. Only the countdown is required.
#[derive(Debug)]
pub struct MissionTargets {
    countdown: Slot,
    status_pill: Option<Slot>,
    launch_date: Option<Slot>,
    launch_site: Option<Slot>,
    timeline: Option<Slot>,
    status_panel: Option<Slot>,
}

impl MissionTargets {
    /// Claim the mission slots; `None` without a countdown slot.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            countdown: doc.claim(slots::COUNTDOWN)?,
            status_pill: doc.claim(slots::STATUS_PILL),
            launch_date: doc.claim(slots::LAUNCH_DATE),
            launch_site: doc.claim(slots::LAUNCH_SITE),
            timeline: doc.claim(slots::TIMELINE),
            status_panel: doc.claim(slots::STATUS_PANEL),
        })
    }
}

#[derive(Debug)]
struct MissionState {
    launch: DateTime<Utc>,
    status: Option<String>,
}

/// Countdown, status panel and timeline.
#[derive(Debug)]
pub struct MissionWidget {
    fetcher: Fetcher,
    settings: MissionSettings,
    targets: MissionTargets,
    handle: MissionHandle,
    state: RwLock<MissionState>,
}

impl MissionWidget {
    /// Build the widget; nothing is fetched until [`MissionWidget::load`].
    pub fn new(fetcher: Fetcher, settings: MissionSettings, targets: MissionTargets) -> Self {
        let state = MissionState {
            launch: settings.fallback_launch,
            status: None,
        };
        Self {
            fetcher,
            settings,
            targets,
            handle: MissionHandle::default(),
            state: RwLock::new(state),
        }
    }

    /// Shared view of the loaded document.
    pub fn handle(&self) -> MissionHandle {
        self.handle.clone()
    }

    /// Current launch instant.
    pub fn launch_instant(&self) -> DateTime<Utc> {
        self.state.read().launch
    }

    /// Current status text, provider status preferred.
    pub fn status(&self) -> Option<String> {
        self.state.read().status.clone()
    }

    /// Fetch the mission document and render it.
    ///
    /// On failure the fallback instant stays in force and the static panel
    /// content is left alone. The provider lookup is separate: see
    /// [`MissionWidget::start_lookup`].
    pub async fn load(&self) {
        let doc = match self
            .fetcher
            .get_json::<MissionDocument>(&self.settings.mission)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    widget = "mission",
                    error = %e,
                    fallback = %self.settings.fallback_launch,
                    "mission document unavailable, using fallback launch instant"
                );
                metrics::inc_fallback("mission");
                return;
            }
        };

        let launch = match doc.mission.launch_date.as_deref().and_then(parse_instant) {
            Some(instant) => instant,
            None => {
                warn!(widget = "mission", "mission document has no parseable launch date");
                self.settings.fallback_launch
            }
        };
        {
            let mut state = self.state.write();
            state.launch = launch;
            state.status = doc.mission.status.clone();
        }

        self.render_info(&doc.mission);
        if let Some(timeline) = &self.targets.timeline {
            timeline.replace(render_timeline(&doc.milestones, None));
        }
        info!(
            widget = "mission",
            launch = %launch,
            milestones = doc.milestones.len(),
            "mission document loaded"
        );
        self.handle.set(doc);
    }

    /// Run [`MissionWidget::lookup_launch`] in the background.
    pub fn start_lookup(self: &Arc<Self>) -> TaskHandle {
        let widget = Arc::clone(self);
        spawn_detached("launch-lookup", async move {
            widget.lookup_launch().await;
        })
    }

    /// Best-effort launch-schedule lookup. A match overrides the launch
    /// instant and status; any failure keeps the current ones.
    pub async fn lookup_launch(&self) {
        let search = match self
            .fetcher
            .get_json::<LaunchSearch>(&self.settings.launch)
            .await
        {
            Ok(search) => search,
            Err(e) => {
                debug!(widget = "mission", error = %e, "launch lookup failed, keeping current instant");
                return;
            }
        };
        let Some((record, net)) = find_launch(&search, &self.settings.names) else {
            debug!(widget = "mission", "no matching launch in schedule");
            return;
        };

        self.state.write().launch = net;
        if let Some(slot) = &self.targets.launch_date {
            slot.set_text(&format!("Launch: {}", net.format("%B %Y")));
        }
        if let Some(status) = record.status.as_ref().and_then(|s| s.name.as_deref()) {
            let upper = status.to_uppercase();
            self.state.write().status = Some(upper.clone());
            if let Some(pill) = &self.targets.status_pill {
                pill.set_text(&upper);
            }
            if let Some(doc) = self.handle.get() {
                self.render_status_panel(&doc.mission, Some(&upper));
            }
        }
        info!(widget = "mission", launch = %net, "launch instant updated from schedule");
    }

    fn render_info(&self, mission: &MissionInfo) {
        if let Some(pill) = &self.targets.status_pill {
            pill.replace(text_or_placeholder(mission.status.as_deref()));
        }
        if let Some(slot) = &self.targets.launch_date {
            slot.replace(format!(
                "Launch: {}",
                text_or_placeholder(mission.launch_date_display.as_deref())
            ));
        }
        if let Some(slot) = &self.targets.launch_site {
            slot.replace(text_or_placeholder(mission.launch_site.as_deref()));
        }
        self.render_status_panel(mission, mission.status.as_deref());
        metrics::inc_render("mission");
    }

    fn render_status_panel(&self, mission: &MissionInfo, status: Option<&str>) {
        let Some(panel) = &self.targets.status_panel else {
            return;
        };
        let rows = [
            ("STATUS", "status-current", text_or_placeholder(status)),
            ("VEHICLE", "status-vehicle", text_or_placeholder(mission.vehicle.as_deref())),
            ("SPACECRAFT", "status-spacecraft", text_or_placeholder(mission.spacecraft.as_deref())),
            ("CREW", "status-crew", crew_text(mission.crew.as_ref())),
            ("DURATION", "status-duration", text_or_placeholder(mission.duration.as_deref())),
            ("DESTINATION", "status-destination", text_or_placeholder(mission.landing_site.as_deref())),
        ];
        let html: String = rows
            .iter()
            .map(|(label, id, value)| {
                format!(
                    r#"<div class="status-item"><span class="status-label">{label}</span><span class="status-value" id="{id}">{value}</span></div>"#
                )
            })
            .collect();
        panel.replace(html);
    }

    /// Render the countdown for `now` and re-derive milestone statuses.
    pub fn tick(&self, now: DateTime<Utc>) -> Countdown {
        let countdown = Countdown::between(self.launch_instant(), now);
        self.targets.countdown.replace(countdown.render());

        if let (Some(timeline), Some(doc)) = (&self.targets.timeline, self.handle.get()) {
            timeline.replace(render_timeline(&doc.milestones, countdown.elapsed_seconds()));
        }
        countdown
    }

    /// Tick now, then every countdown interval.
    pub fn start_countdown(self: &Arc<Self>) -> TaskHandle {
        self.tick(Utc::now());
        let widget = Arc::clone(self);
        spawn_repeating("countdown", self.settings.countdown_interval, move || {
            let widget = Arc::clone(&widget);
            async move {
                widget.tick(Utc::now());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_780_000_000 + secs, 0)
            .single()
            .expect("test: valid timestamp")
    }

    #[test]
    fn test_countdown_one_of_each_unit() {
        let launch = at(0) + chrono::Duration::milliseconds(90_061_000);
        let c = Countdown::between(launch, at(0));
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (1, 1, 1, 1));
        assert!(!c.elapsed);
        assert_eq!(
            c.padded(),
            ("001".into(), "01".into(), "01".into(), "01".into())
        );
    }

    #[test]
    fn test_countdown_after_launch_uses_absolute_value() {
        let c = Countdown::between(at(0), at(3_725));
        assert!(c.elapsed);
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (0, 1, 2, 5));
        assert_eq!(c.elapsed_seconds(), Some(3_725.0));
    }

    #[test]
    fn test_countdown_days_not_clamped() {
        let c = Countdown::from_millis(1_234 * MS_PER_DAY, false);
        assert_eq!(c.padded().0, "1234");
    }

    #[test]
    fn test_milestone_statuses_mid_mission() {
        let statuses = milestone_statuses(&[0.0, 600.0, 1200.0], Some(900.0));
        assert_eq!(
            statuses,
            vec![
                MilestoneStatus::Complete,
                MilestoneStatus::Active,
                MilestoneStatus::Pending
            ]
        );
    }

    #[test]
    fn test_milestone_last_reached_stays_active() {
        let statuses = milestone_statuses(&[0.0, 600.0], Some(10_000.0));
        assert_eq!(statuses, vec![MilestoneStatus::Complete, MilestoneStatus::Active]);
    }

    #[test]
    fn test_milestone_before_launch_all_pending() {
        let statuses = milestone_statuses(&[0.0, 600.0], None);
        assert!(statuses.iter().all(|s| *s == MilestoneStatus::Pending));
    }

    #[test]
    fn test_milestone_statuses_partition() {
        let thresholds = [0.0, 60.0, 120.0, 500.0, 900.0];
        for elapsed in [0.0, 30.0, 60.0, 119.0, 499.0, 899.0, 5_000.0] {
            let statuses = milestone_statuses(&thresholds, Some(elapsed));
            let active = statuses.iter().filter(|s| **s == MilestoneStatus::Active).count();
            assert!(active <= 1);
            let first_non_complete = statuses
                .iter()
                .position(|s| *s != MilestoneStatus::Complete)
                .unwrap_or(statuses.len());
            assert!(statuses[first_non_complete..]
                .iter()
                .skip(1)
                .all(|s| *s == MilestoneStatus::Pending));
        }
    }

    #[test]
    fn test_icon_mapping() {
        assert_eq!(milestone_icon(Some("rocket")), "\u{1F680}");
        assert_eq!(milestone_icon(Some("unknown")), "\u{25CF}");
        assert_eq!(milestone_icon(None), "\u{25CF}");
    }

    fn search(json: &str) -> LaunchSearch {
        serde_json::from_str(json).expect("test: valid search JSON")
    }

    #[test]
    fn test_find_launch_matches_case_insensitively() {
        let names = vec!["artemis ii".to_string(), "artemis 2".to_string()];
        let s = search(
            r#"{"results":[
                {"name":"Starlink 9-3","net":"2026-03-01T00:00:00Z"},
                {"name":"SLS Block 1 | ARTEMIS II","net":"2026-04-05T22:24:00Z","status":{"name":"Go for Launch"}}
            ]}"#,
        );
        let (record, net) = find_launch(&s, &names).expect("match");
        assert_eq!(net.to_rfc3339(), "2026-04-05T22:24:00+00:00");
        assert_eq!(
            record.status.as_ref().and_then(|s| s.name.as_deref()),
            Some("Go for Launch")
        );
    }

    #[test]
    fn test_find_launch_first_match_without_net_is_none() {
        let names = vec!["artemis 2".to_string()];
        let s = search(
            r#"{"results":[{"name":"Artemis 2"},{"name":"Artemis 2 backup","net":"2026-04-05T22:24:00Z"}]}"#,
        );
        assert!(find_launch(&s, &names).is_none());
    }

    #[test]
    fn test_find_launch_no_results() {
        assert!(find_launch(&LaunchSearch::default(), &["artemis ii".into()]).is_none());
    }

    #[test]
    fn test_crew_text() {
        assert_eq!(crew_text(Some(&serde_json::json!(4))), "4 Astronauts");
        assert_eq!(crew_text(Some(&serde_json::json!("four"))), "four Astronauts");
        assert_eq!(crew_text(None), PLACEHOLDER);
    }

    #[test]
    fn test_document_decodes_partial_fields() {
        let doc: MissionDocument = serde_json::from_str(
            r#"{"mission":{"status":"Scheduled","crew":4,"launchDateDisplay":"April 2026"},
                "milestones":[{"id":"liftoff","name":"Liftoff","timeSeconds":0,"icon":"rocket"}]}"#,
        )
        .expect("test: decodes");
        assert_eq!(doc.mission.status.as_deref(), Some("Scheduled"));
        assert_eq!(doc.milestones[0].time_seconds, 0.0);
        assert!(doc.fallback_images.is_empty());
    }

    #[test]
    fn test_document_tolerates_null_fields() {
        let doc: MissionDocument = serde_json::from_str(
            r#"{"mission":{"launchDate":"2026-04-01T22:24:00Z"},
                "milestones":[{"name":"Liftoff","timeSeconds":null}],
                "fallbackNews":null,
                "fallbackImages":[{"url":"https://images.example.org/a.jpg","title":null,"description":null}]}"#,
        )
        .expect("test: decodes");
        assert_eq!(doc.mission.launch_date.as_deref(), Some("2026-04-01T22:24:00Z"));
        assert_eq!(doc.milestones[0].time_seconds, 0.0);
        assert!(doc.fallback_news.is_empty());
        assert_eq!(doc.fallback_images[0].title, "");
        assert_eq!(doc.fallback_images[0].url, "https://images.example.org/a.jpg");
    }

    #[test]
    fn test_timeline_escapes_and_marks_status() {
        let milestones = vec![
            Milestone {
                id: Some("a".into()),
                name: Some("<b>Liftoff</b>".into()),
                time_seconds: 0.0,
                ..Milestone::default()
            },
            Milestone {
                id: Some("b".into()),
                name: Some("TLI".into()),
                time_seconds: 600.0,
                ..Milestone::default()
            },
        ];
        let html = render_timeline(&milestones, Some(30.0));
        assert!(html.contains(r#"class="milestone active""#));
        assert!(html.contains(r#"class="milestone pending""#));
        assert!(html.contains("&lt;b&gt;Liftoff&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
