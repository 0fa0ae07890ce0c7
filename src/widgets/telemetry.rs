//! # Widget: Host Telemetry Panel
//!
//! ## Responsibility
//! Poll the host snapshot every few seconds and render it as an ordered
//! key/value list.
//!
//! ## Guarantees
//! - Rows always appear in the same order; conditional groups appear whole
//! - An empty value renders as the placeholder, never as a missing row
//! - A failed cycle writes the reason to the error slot and keeps the last
//!   successful render
//!
//! ## NOT Responsible For
//! - Producing the snapshot (an external collector writes it)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ConfigError, DeckConfig};
use crate::fetch::{Endpoint, Fetcher};
use crate::metrics;
use crate::sanitize::escape_html;
use crate::view::{Document, Slot};
use crate::widgets::{PollWidget, PLACEHOLDER};

/// Slot names this widget writes.
pub mod slots {
    /// Key/value rows. Required.
    pub const ROWS: &str = "telemetry";
    /// Inline failure message.
    pub const ERROR: &str = "telemetry-error";
    /// `Last update: …` line.
    pub const STAMP: &str = "telemetry-stamp";
}

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

// ── Snapshot ───────────────────────────────────────────────────────────────

/// Host snapshot. Every field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Host name.
    pub hostname: Option<String>,
    /// Snapshot time, already formatted by the collector.
    pub time_utc: Option<String>,
    /// Uptime, human readable.
    pub uptime_human: Option<String>,
    /// 1/5/15 minute load averages.
    pub loadavg: Option<Vec<f64>>,
    /// Processor details.
    pub cpu: Option<CpuInfo>,
    /// Memory usage.
    pub mem: Option<Usage>,
    /// Root filesystem usage.
    pub disk_root: Option<Usage>,
    /// Network counters.
    pub net: Option<NetInfo>,
    /// Process table.
    pub processes: Option<Processes>,
    /// Service states.
    pub services: Option<Services>,
    /// Local language-model usage.
    pub llm: Option<LlmInfo>,
}

/// Processor details.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CpuInfo {
    /// Model string.
    pub model: Option<String>,
    /// Core count.
    pub cores: Option<u64>,
    /// Utilisation in percent.
    pub usage_percent: Option<f64>,
}

/// Used/total byte pair.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Bytes in use.
    pub used_bytes: Option<f64>,
    /// Capacity in bytes.
    pub total_bytes: Option<f64>,
}

/// Network interfaces.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetInfo {
    /// Primary interface.
    pub eth0: Option<NetCounters>,
}

/// Interface byte counters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetCounters {
    /// Bytes received.
    pub rx_bytes: Option<f64>,
    /// Bytes sent.
    pub tx_bytes: Option<f64>,
}

/// Process table summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Processes {
    /// Running processes.
    pub count: Option<u64>,
}

/// Service states. Collectors write strings or booleans.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Services {
    /// Web server.
    pub nginx: Option<Value>,
    /// Mesh VPN.
    pub tailscale: Option<Value>,
    /// Container runtime.
    pub docker: Option<Value>,
}

/// Language-model usage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmInfo {
    /// Whether a model is loaded.
    #[serde(deserialize_with = "crate::widgets::null_as_default")]
    pub available: bool,
    /// Model name.
    pub model: Option<String>,
    /// Context window used, in percent.
    pub context_percent: Option<f64>,
    /// Tokens processed.
    pub total_tokens: Option<u64>,
    /// Prompt tokens.
    pub input_tokens: Option<u64>,
    /// Completion tokens.
    pub output_tokens: Option<u64>,
}

// ── Formatting ─────────────────────────────────────────────────────────────

/// Scale a byte count over B/KB/MB/GB/TB (1024 steps); one decimal above
/// bytes. `None` is the placeholder.
pub fn fmt_bytes(bytes: Option<f64>) -> String {
    let Some(mut n) = bytes else {
        return PLACEHOLDER.to_string();
    };
    let mut unit = 0;
    while n >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        n /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n:.0} {}", BYTE_UNITS[unit])
    } else {
        format!("{n:.1} {}", BYTE_UNITS[unit])
    }
}

fn usage_line(usage: Option<&Usage>) -> String {
    format!(
        "{} / {} used",
        fmt_bytes(usage.and_then(|u| u.used_bytes)),
        fmt_bytes(usage.and_then(|u| u.total_bytes)),
    )
}

/// Text of a loosely typed value; `None` for null, `false` and `""`.
fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Ordered `(key, value)` rows for `snapshot`.
pub fn telemetry_rows(snapshot: &TelemetrySnapshot) -> Vec<(&'static str, Option<String>)> {
    let mut rows = vec![
        ("HOST", snapshot.hostname.clone()),
        ("TIME (UTC)", snapshot.time_utc.clone()),
        ("UPTIME", snapshot.uptime_human.clone()),
        (
            "LOAD",
            snapshot.loadavg.as_ref().map(|loads| {
                loads
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        ),
    ];

    if let Some(cpu) = &snapshot.cpu {
        if let Some(model) = cpu.model.as_ref().filter(|m| !m.is_empty()) {
            rows.push(("CPU", Some(model.clone())));
        }
        if let Some(cores) = cpu.cores {
            rows.push(("CORES", Some(cores.to_string())));
        }
        if let Some(usage) = cpu.usage_percent {
            rows.push(("CPU %", Some(format!("{usage:.1}%"))));
        }
    }

    rows.push(("MEM", Some(usage_line(snapshot.mem.as_ref()))));
    rows.push(("DISK /", Some(usage_line(snapshot.disk_root.as_ref()))));

    if let Some(eth0) = snapshot.net.as_ref().and_then(|n| n.eth0.as_ref()) {
        rows.push(("NET RX", Some(fmt_bytes(eth0.rx_bytes))));
        rows.push(("NET TX", Some(fmt_bytes(eth0.tx_bytes))));
    }

    if let Some(count) = snapshot.processes.as_ref().and_then(|p| p.count) {
        rows.push(("PROCS", Some(count.to_string())));
    }

    if let Some(services) = &snapshot.services {
        rows.push((
            "NGINX",
            Some(value_text(services.nginx.as_ref()).unwrap_or_else(|| "unknown".to_string())),
        ));
        if let Some(tailscale) = value_text(services.tailscale.as_ref()) {
            rows.push(("TAILSCALE", Some(tailscale)));
        }
        if let Some(docker) = value_text(services.docker.as_ref()) {
            rows.push(("DOCKER", Some(docker)));
        }
    }

    match snapshot.llm.as_ref().filter(|llm| llm.available) {
        Some(llm) => {
            rows.push(("LLM MODEL", llm.model.clone()));
            if let Some(pct) = llm.context_percent {
                rows.push(("CONTEXT %", Some(format!("{pct:.3}%"))));
            }
            if let Some(total) = llm.total_tokens {
                rows.push(("TOKENS (TOTAL)", Some(total.to_string())));
            }
            if let Some(input) = llm.input_tokens {
                rows.push(("TOKENS (IN)", Some(input.to_string())));
            }
            if let Some(output) = llm.output_tokens {
                rows.push(("TOKENS (OUT)", Some(output.to_string())));
            }
        }
        None => rows.push(("LLM", Some("unavailable".to_string()))),
    }

    rows
}

/// Row markup for `snapshot`.
pub fn render_rows(snapshot: &TelemetrySnapshot) -> String {
    telemetry_rows(snapshot)
        .into_iter()
        .map(|(key, value)| {
            let value = match value.as_deref() {
                Some(v) if !v.is_empty() => escape_html(v),
                _ => PLACEHOLDER.to_string(),
            };
            format!(r#"<div class="row"><div class="k">{key}</div><div class="v">{value}</div></div>"#)
        })
        .collect()
}

// ── Widget ─────────────────────────────────────────────────────────────────

/// View targets. Only the rows slot is required.
#[derive(Debug)]
pub struct TelemetryTargets {
    rows: Slot,
    error: Option<Slot>,
    stamp: Option<Slot>,
}

impl TelemetryTargets {
    /// Claim the telemetry slots; `None` without a rows slot.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            rows: doc.claim(slots::ROWS)?,
            error: doc.claim(slots::ERROR),
            stamp: doc.claim(slots::STAMP),
        })
    }
}

/// Host telemetry panel.
#[derive(Debug)]
pub struct TelemetryWidget {
    fetcher: Fetcher,
    endpoint: Endpoint,
    targets: TelemetryTargets,
}

impl TelemetryWidget {
    /// Build the widget against `endpoint`.
    pub fn new(fetcher: Fetcher, endpoint: Endpoint, targets: TelemetryTargets) -> Self {
        Self {
            fetcher,
            endpoint,
            targets,
        }
    }

    /// Build the widget from the `[telemetry]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint URL does not resolve.
    pub fn from_config(
        config: &DeckConfig,
        fetcher: Fetcher,
        targets: TelemetryTargets,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(fetcher, config.telemetry_endpoint()?, targets))
    }

    /// Polling period.
    pub fn interval(&self) -> std::time::Duration {
        self.endpoint.interval
    }
}

#[async_trait]
impl PollWidget for TelemetryWidget {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn refresh(&self) {
        if let Some(err) = &self.targets.error {
            err.clear();
        }
        match self
            .fetcher
            .get_json::<TelemetrySnapshot>(&self.endpoint)
            .await
        {
            Ok(snapshot) => {
                self.targets.rows.replace(render_rows(&snapshot));
                if let Some(stamp) = &self.targets.stamp {
                    stamp.set_text(&format!(
                        "Last update: {}",
                        snapshot.time_utc.as_deref().unwrap_or(PLACEHOLDER)
                    ));
                }
                metrics::inc_render("telemetry");
                debug!(widget = "telemetry", host = ?snapshot.hostname, "telemetry rendered");
            }
            Err(e) => {
                warn!(widget = "telemetry", error = %e, "telemetry fetch failed");
                if let Some(err) = &self.targets.error {
                    err.set_text(&format!("Telemetry offline ({e})."));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(json: serde_json::Value) -> TelemetrySnapshot {
        serde_json::from_value(json).expect("test: snapshot decodes")
    }

    fn keys(rows: &[(&'static str, Option<String>)]) -> Vec<&'static str> {
        rows.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_fmt_bytes_units() {
        assert_eq!(fmt_bytes(None), PLACEHOLDER);
        assert_eq!(fmt_bytes(Some(512.0)), "512 B");
        assert_eq!(fmt_bytes(Some(1536.0)), "1.5 KB");
        assert_eq!(fmt_bytes(Some(8.0 * 1024.0 * 1024.0 * 1024.0)), "8.0 GB");
        assert_eq!(fmt_bytes(Some(5.0 * 1024f64.powi(5))), "5120.0 TB");
    }

    #[test]
    fn test_null_mem_renders_placeholders() {
        let rows = telemetry_rows(&snapshot(serde_json::json!({"mem": null})));
        let mem = rows.iter().find(|(k, _)| *k == "MEM").expect("MEM row present");
        assert_eq!(mem.1.as_deref(), Some("\u{2014} / \u{2014} used"));
    }

    #[test]
    fn test_null_llm_availability_reads_as_unavailable() {
        let rows = telemetry_rows(&snapshot(serde_json::json!({
            "hostname": "armory",
            "llm": {"available": null, "model": "local-7b"}
        })));
        let llm = rows.iter().find(|(k, _)| *k == "LLM").expect("LLM row present");
        assert_eq!(llm.1.as_deref(), Some("unavailable"));
    }

    #[test]
    fn test_minimal_snapshot_rows() {
        let rows = telemetry_rows(&TelemetrySnapshot::default());
        assert_eq!(
            keys(&rows),
            vec!["HOST", "TIME (UTC)", "UPTIME", "LOAD", "MEM", "DISK /", "LLM"]
        );
        let html = render_rows(&TelemetrySnapshot::default());
        assert!(html.contains(r#"<div class="k">HOST</div><div class="v">—</div>"#));
        assert!(html.contains(r#"<div class="v">unavailable</div>"#));
    }

    #[test]
    fn test_full_snapshot_row_order() {
        let snap = snapshot(serde_json::json!({
            "hostname": "armory",
            "time_utc": "2026-04-01 12:00:00",
            "uptime_human": "3 days",
            "loadavg": [0.5, 1.0, 0.25],
            "cpu": {"model": "Ryzen", "cores": 8, "usage_percent": 12.345},
            "mem": {"used_bytes": 1024, "total_bytes": 2048},
            "disk_root": {"used_bytes": 10, "total_bytes": 20},
            "net": {"eth0": {"rx_bytes": 1048576, "tx_bytes": 0}},
            "processes": {"count": 211},
            "services": {"nginx": "", "tailscale": "up", "docker": false},
            "llm": {"available": true, "model": "local-7b", "contextPercent": 1.23456, "totalTokens": 10, "inputTokens": 6, "outputTokens": 4}
        }));
        let rows = telemetry_rows(&snap);
        assert_eq!(
            keys(&rows),
            vec![
                "HOST", "TIME (UTC)", "UPTIME", "LOAD", "CPU", "CORES", "CPU %", "MEM",
                "DISK /", "NET RX", "NET TX", "PROCS", "NGINX", "TAILSCALE", "LLM MODEL",
                "CONTEXT %", "TOKENS (TOTAL)", "TOKENS (IN)", "TOKENS (OUT)"
            ]
        );
        let value = |key: &str| {
            rows.iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        assert_eq!(value("LOAD"), "0.5 1 0.25");
        assert_eq!(value("CPU %"), "12.3%");
        assert_eq!(value("MEM"), "1.0 KB / 2.0 KB used");
        assert_eq!(value("NET RX"), "1.0 MB");
        assert_eq!(value("NGINX"), "unknown");
        assert_eq!(value("CONTEXT %"), "1.235%");
    }

    #[test]
    fn test_render_escapes_values() {
        let snap = snapshot(serde_json::json!({"hostname": "<img src=x onerror=alert(1)>"}));
        let html = render_rows(&snap);
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    #[tokio::test]
    async fn test_failed_refresh_sets_error_and_keeps_rows() {
        let doc = Document::with_slots([slots::ROWS, slots::ERROR, slots::STAMP]);
        let targets = TelemetryTargets::claim(&doc).expect("test: declared");
        let endpoint = Endpoint::new(
            "telemetry",
            reqwest::Url::parse("http://127.0.0.1:9/telemetry.json").expect("test: url"),
        )
        .with_retry(crate::fetch::RetryPolicy::once());
        let widget = TelemetryWidget::new(Fetcher::default(), endpoint, targets);

        widget.targets.rows.replace("<div class=\"row\">previous</div>");
        widget.refresh().await;

        assert_eq!(
            doc.fragment(slots::ROWS).as_deref(),
            Some("<div class=\"row\">previous</div>")
        );
        let error = doc.fragment(slots::ERROR).unwrap_or_default();
        assert!(error.starts_with("Telemetry offline (network error"));
        assert!(error.ends_with(")."));
    }
}
