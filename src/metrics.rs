//! Prometheus metrics for the dashboard widgets.
//!
//! ## Usage
//!
//! Call [`init_metrics`] once at process startup **before** spawning any
//! widget. The helper functions (`inc_fetch_attempt`, `inc_render`, …) are
//! no-ops if `init_metrics` was never called, so widgets are always safe to
//! run without a registry.
//!
//! ## Metrics Exposed
//!
//! | Name | Type | Labels |
//! |------|------|--------|
//! | `deck_fetch_attempts_total` | Counter | `endpoint` |
//! | `deck_fetch_failures_total` | Counter | `endpoint`, `kind` |
//! | `deck_fetch_duration_seconds` | Histogram | `endpoint` |
//! | `deck_renders_total` | Counter | `widget` |
//! | `deck_fallbacks_total` | Counter | `widget` |

use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::DeckError;

// ── Internal metrics bundle ────────────────────────────────────────────────

/// All Prometheus metrics for the dashboard, stored in a single [`OnceLock`].
pub struct Metrics {
    /// Prometheus registry that owns all metric descriptors.
    pub registry: Registry,
    /// HTTP attempts per endpoint, retries included.
    pub fetch_attempts: CounterVec,
    /// Failed attempts per endpoint and failure kind.
    pub fetch_failures: CounterVec,
    /// Wall time of whole fetch calls, backoff included.
    pub fetch_duration: HistogramVec,
    /// Slot renders per widget.
    pub renders: CounterVec,
    /// Static-fallback renders per widget.
    pub fallbacks: CounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<CounterVec, DeckError> {
    let c = CounterVec::new(Opts::new(name, help), labels)
        .map_err(|e| DeckError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|e| DeckError::Other(format!("metrics registration failed: {e}")))?;
    Ok(c)
}

// ── Initialisation ─────────────────────────────────────────────────────────

/// Initialise all Prometheus metrics and register them with a private registry.
///
/// Calling it a second time is a no-op (returns `Ok(())`).
///
/// # Errors
///
/// Returns [`DeckError::Other`] if metric construction or registration fails.
///
/// # Panics
///
/// This function never panics.
pub fn init_metrics() -> Result<(), DeckError> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let fetch_attempts = counter(
        &registry,
        "deck_fetch_attempts_total",
        "HTTP attempts per endpoint",
        &["endpoint"],
    )?;
    let fetch_failures = counter(
        &registry,
        "deck_fetch_failures_total",
        "Failed fetch attempts by endpoint and kind",
        &["endpoint", "kind"],
    )?;
    let renders = counter(&registry, "deck_renders_total", "Slot renders per widget", &["widget"])?;
    let fallbacks = counter(
        &registry,
        "deck_fallbacks_total",
        "Static fallback renders per widget",
        &["widget"],
    )?;

    let fetch_duration = HistogramVec::new(
        HistogramOpts::new("deck_fetch_duration_seconds", "Fetch duration including backoff"),
        &["endpoint"],
    )
    .map_err(|e| DeckError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(fetch_duration.clone()))
        .map_err(|e| DeckError::Other(format!("metrics registration failed: {e}")))?;

    // If another thread raced us, the first one wins.
    let _ = METRICS.set(Metrics {
        registry,
        fetch_attempts,
        fetch_failures,
        fetch_duration,
        renders,
        fallbacks,
    });

    Ok(())
}

fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

// ── Public helper functions ────────────────────────────────────────────────

/// Count one HTTP attempt against `endpoint`.
pub fn inc_fetch_attempt(endpoint: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.fetch_attempts.get_metric_with_label_values(&[endpoint]) {
            c.inc();
        }
    }
}

/// Count one failed attempt of the given kind.
pub fn inc_fetch_failure(endpoint: &str, kind: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.fetch_failures.get_metric_with_label_values(&[endpoint, kind]) {
            c.inc();
        }
    }
}

/// Observe the duration of a whole fetch call.
pub fn record_fetch_duration(endpoint: &str, d: Duration) {
    if let Some(m) = metrics() {
        if let Ok(h) = m.fetch_duration.get_metric_with_label_values(&[endpoint]) {
            h.observe(d.as_secs_f64());
        }
    }
}

/// Count one render of `widget`.
pub fn inc_render(widget: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.renders.get_metric_with_label_values(&[widget]) {
            c.inc();
        }
    }
}

/// Count one static-fallback render of `widget`.
pub fn inc_fallback(widget: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.fallbacks.get_metric_with_label_values(&[widget]) {
            c.inc();
        }
    }
}

/// Gather and encode all metrics in the Prometheus text exposition format.
///
/// Returns an empty string if metrics have not been initialised or if
/// encoding fails.
///
/// # Panics
///
/// This function never panics.
pub fn gather_metrics() -> String {
    let Some(m) = metrics() else {
        return String::new();
    };
    let families = m.registry.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
