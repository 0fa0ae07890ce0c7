//! # mission-deck
//!
//! A poll-render dashboard for a crewed lunar launch: mission countdown and
//! timeline, an image gallery carousel, an optional news strip, a host
//! telemetry panel, a project showcase and a decorative starfield.
//!
//! ## Architecture
//!
//! Every widget follows the same loop:
//! ```text
//! Fetcher (bounded retry) → Sanitizer → Renderer (bounded window) → Slot
//!        ↑                                                           │
//!        └──────────── Scheduler (own repeating timer) ◄─────────────┘
//! ```
//! Slots live in a shared [`view::Document`]; each slot has exactly one
//! writer. The binary serves the composed page and streams slot
//! replacements to the browser.

// ── Lint policy ───────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![warn(missing_docs)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod fetch;
pub mod frame_sync;
pub mod metrics;
pub mod page;
pub mod sanitize;
pub mod schedule;
pub mod server;
pub mod starfield;
pub mod view;
pub mod widgets;

// Re-exports for convenience
pub use config::DeckConfig;
pub use fetch::{Endpoint, FetchError, Fetcher, RetryPolicy};
pub use schedule::{spawn_detached, spawn_once, spawn_poll, spawn_repeating, TaskHandle, TaskSet};
pub use view::{Document, Slot, SlotUpdate};

/// Initialise the global tracing subscriber.
///
/// Reads the `LOG_FORMAT` environment variable to choose output format:
/// - `"json"`: structured JSON output for log aggregators
/// - anything else (including unset): human-readable pretty output
///
/// Filter level is controlled by `RUST_LOG` (e.g. `RUST_LOG=info`).
///
/// # Errors
///
/// Returns [`DeckError::Other`] if the global subscriber has already been set
/// (e.g. by a previous call or a test harness).
///
/// # Panics
///
/// This function never panics.
pub fn init_tracing() -> Result<(), DeckError> {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init(),
    };

    result.map_err(|e| DeckError::Other(format!("tracing init failed: {e}")))
}

/// Top-level dashboard errors.
///
/// Widget-level failures never reach this type: they degrade to a fallback
/// rendering or an inline status string. These variants cover startup and
/// serving only.
#[derive(Error, Debug)]
pub enum DeckError {
    /// The configuration file could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// The HTTP server could not bind or terminated abnormally.
    #[error("server error: {0}")]
    Server(String),

    /// Catch-all for errors that do not fit a specific variant.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display_includes_message() {
        let err = DeckError::Server("address in use".to_string());
        assert_eq!(err.to_string(), "server error: address in use");
    }

    #[test]
    fn test_init_tracing_second_call_returns_err() {
        // First call may succeed or fail depending on test execution order.
        let _ = init_tracing();
        let result = init_tracing();
        assert!(result.is_err(), "double init must return Err, not panic");
    }
}
