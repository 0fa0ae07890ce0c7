//! Configuration validation engine.
//!
//! ## Responsibility
//! Validate semantic constraints on a parsed [`DeckConfig`] that cannot be
//! expressed through the type system alone (ranges, cross-field invariants,
//! parseable instants and URLs).
//!
//! ## Guarantees
//! - Validation collects *all* errors before returning (no short-circuit)
//! - Error messages include the field path and the invalid value
//! - Disabled widgets are not held to their interval constraints
//!
//! ## NOT Responsible For
//! - Parsing TOML (that belongs to `loader`)
//! - File I/O (that belongs to `loader`)

use chrono::DateTime;
use reqwest::Url;

use super::DeckConfig;

/// Upper bound on seeded stars; beyond this the SVG gets unreasonably large.
const MAX_STAR_COUNT: usize = 10_000;

/// Errors arising from configuration parsing, validation, or I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("Parse error in {file}: {source}")]
    Parse {
        /// Path of the file that failed to parse.
        file: String,
        /// Underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// One or more semantic validation rules failed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A specific field has an out-of-range or contradictory value.
    #[error("Field '{field}' has invalid value {value}: {reason}")]
    InvalidField {
        /// Dot-separated field path (e.g., "retry.attempts").
        field: String,
        /// String representation of the invalid value.
        value: String,
        /// Human-readable explanation of the constraint.
        reason: String,
    },

    /// File I/O error.
    #[error("IO error reading {file}: {source}")]
    Io {
        /// Path of the file that could not be read.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate all semantic constraints on a [`DeckConfig`].
///
/// # Errors
///
/// Returns every violation found.
///
/// # Panics
///
/// This function never panics.
pub fn validate(config: &DeckConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // ── Retry settings ───────────────────────────────────────────────
    if config.retry.attempts == 0 {
        errors.push(invalid("retry.attempts", 0, "must be at least 1"));
    }
    if config.retry.attempts > 10 {
        errors.push(invalid(
            "retry.attempts",
            config.retry.attempts,
            "must be at most 10; this is a small fixed ceiling",
        ));
    }

    // ── Sources ──────────────────────────────────────────────────────
    if Url::parse(&config.sources.base_url).is_err() {
        errors.push(invalid(
            "sources.base_url",
            &config.sources.base_url,
            "must be an absolute URL",
        ));
    }
    if config.sources.request_timeout_ms == 0 {
        errors.push(invalid("sources.request_timeout_ms", 0, "must be at least 1ms"));
    }

    // ── Mission ──────────────────────────────────────────────────────
    if config.mission.enabled {
        if DateTime::parse_from_rfc3339(&config.mission.fallback_launch).is_err() {
            errors.push(invalid(
                "mission.fallback_launch",
                &config.mission.fallback_launch,
                "must be an RFC 3339 instant",
            ));
        }
        if config.mission.countdown_interval_ms == 0 {
            errors.push(invalid("mission.countdown_interval_ms", 0, "must be at least 1ms"));
        }
        if config.mission.launch_names.iter().all(|n| n.trim().is_empty()) {
            errors.push(invalid(
                "mission.launch_names",
                "[]",
                "at least one non-empty name variant is required",
            ));
        }
    }

    // ── Gallery ──────────────────────────────────────────────────────
    if config.gallery.enabled {
        if config.gallery.interval_ms == 0 {
            errors.push(invalid("gallery.interval_ms", 0, "must be at least 1ms"));
        }
        if config.gallery.max_items == 0 {
            errors.push(invalid("gallery.max_items", 0, "must be at least 1"));
        }
        if config.gallery.auto_advance && config.gallery.rotation_delay_ms == 0 {
            errors.push(invalid(
                "gallery.rotation_delay_ms",
                0,
                "must be at least 1ms when auto_advance is on",
            ));
        }
    }

    // ── News ─────────────────────────────────────────────────────────
    if config.news.enabled {
        if config.news.interval_ms == 0 {
            errors.push(invalid("news.interval_ms", 0, "must be at least 1ms"));
        }
        if config.news.max_items == 0 {
            errors.push(invalid("news.max_items", 0, "must be at least 1"));
        }
    }

    // ── Telemetry ────────────────────────────────────────────────────
    if config.telemetry.enabled && config.telemetry.interval_ms == 0 {
        errors.push(invalid("telemetry.interval_ms", 0, "must be at least 1ms"));
    }

    // ── Frame sync ───────────────────────────────────────────────────
    if config.frame.enabled {
        if config.frame.min_height > config.frame.max_height {
            errors.push(invalid(
                "frame.min_height",
                config.frame.min_height,
                "must be \u{2264} frame.max_height",
            ));
        }
        if config.frame.marker.trim().is_empty() {
            errors.push(invalid("frame.marker", "", "must not be empty"));
        }
    }

    // ── Starfield ────────────────────────────────────────────────────
    if config.starfield.star_count > MAX_STAR_COUNT {
        errors.push(invalid(
            "starfield.star_count",
            config.starfield.star_count,
            "must be at most 10000",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
