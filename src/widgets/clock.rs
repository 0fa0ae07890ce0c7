//! # Widget: Live Clock
//!
//! Writes local `HH:MM:SS` into the `clock` slot once per second.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime, Timelike};

use crate::schedule::{spawn_repeating, TaskHandle};
use crate::view::{Document, Slot};

/// Slot written by the clock.
pub const CLOCK_SLOT: &str = "clock";

/// Update period.
pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);

/// `HH:MM:SS`, zero padded.
pub fn format_clock(time: NaiveTime) -> String {
    format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())
}

/// Live wall clock.
#[derive(Debug)]
pub struct ClockWidget {
    slot: Slot,
}

impl ClockWidget {
    /// Claim the clock slot; `None` if the page has none.
    pub fn claim(doc: &Document) -> Option<Self> {
        Some(Self {
            slot: doc.claim(CLOCK_SLOT)?,
        })
    }

    /// Render `time`.
    pub fn tick(&self, time: NaiveTime) {
        self.slot.set_text(&format_clock(time));
    }

    /// Render now, then every second.
    pub fn start(self: Arc<Self>) -> TaskHandle {
        self.tick(Local::now().time());
        spawn_repeating("clock", CLOCK_PERIOD, move || {
            let clock = Arc::clone(&self);
            async move {
                clock.tick(Local::now().time());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_pads() {
        let t = NaiveTime::from_hms_opt(7, 5, 9).expect("test: valid time");
        assert_eq!(format_clock(t), "07:05:09");
    }

    #[test]
    fn test_tick_writes_slot() {
        let doc = Document::with_slots([CLOCK_SLOT]);
        let clock = ClockWidget::claim(&doc).expect("test: declared");
        clock.tick(NaiveTime::from_hms_opt(23, 59, 1).expect("test: valid time"));
        assert_eq!(doc.fragment(CLOCK_SLOT).as_deref(), Some("23:59:01"));
    }

    #[test]
    fn test_claim_without_slot() {
        let doc = Document::with_slots(["other"]);
        assert!(ClockWidget::claim(&doc).is_none());
    }
}
