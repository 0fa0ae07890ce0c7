//! # Module: Embedded Frame Height Sync
//!
//! ## Responsibility
//! Accept height announcements posted by an embedded child view and size
//! the frame container accordingly.
//!
//! ## Guarantees
//! - Messages from any origin other than the expected one are dropped
//! - Messages with a different `type` marker are dropped
//! - A non-empty `id` must equal the frame identifier; no `id` is accepted
//! - Heights are coerced like numbers (numeric strings included); zero or
//!   unparseable heights fall back to the minimum, and every applied height
//!   lies in `[min, max]`
//!
//! ## NOT Responsible For
//! - Measuring the child document (the child announces its own height)

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{DeckConfig, FrameConfig};
use crate::view::{Document, Slot};

/// Slot holding the frame's height style.
pub const FRAME_STYLE_SLOT: &str = "frame-style";

/// A height announcement, as posted by the child.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameSizeMessage {
    /// Marker identifying the message kind.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Frame the child believes it lives in.
    pub id: Option<Value>,
    /// Announced height; a number or a numeric string.
    pub height: Option<Value>,
}

/// A message relayed by the page together with the origin it came from.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSizeReport {
    /// `MessageEvent.origin` of the post.
    pub origin: String,
    /// `MessageEvent.data`; anything that is not an object is ignored.
    pub data: Value,
}

/// Coerce a loosely typed value the way a numeric conversion would.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn is_truthy_id(id: Option<&Value>) -> bool {
    match id {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(_) => true,
    }
}

/// Validates announcements and writes the resulting height.
#[derive(Debug)]
pub struct FrameHeightSync {
    origin: String,
    marker: String,
    frame_id: String,
    min_height: u32,
    max_height: u32,
    slot: Option<Slot>,
}

impl FrameHeightSync {
    /// Sync for frames announced from `origin`.
    pub fn new(origin: impl Into<String>, frame: &FrameConfig) -> Self {
        Self {
            origin: origin.into(),
            marker: frame.marker.clone(),
            frame_id: frame.frame_id.clone(),
            min_height: frame.min_height,
            max_height: frame.max_height,
            slot: None,
        }
    }

    /// Sync configured from `config`, writing into the frame style slot when
    /// the page declares one.
    pub fn from_config(config: &DeckConfig, doc: &Document) -> Self {
        let mut sync = Self::new(config.server.expected_origin(), &config.frame);
        sync.slot = doc.claim(FRAME_STYLE_SLOT);
        sync
    }

    /// Clamp a coerced height into `[min, max]`; zero/invalid is the minimum.
    pub fn clamp_height(&self, raw: Option<&Value>) -> u32 {
        let min = f64::from(self.min_height);
        let max = f64::from(self.max_height);
        let n = match coerce_number(raw) {
            Some(n) if n != 0.0 => n,
            _ => min,
        };
        n.min(max).max(min).round() as u32
    }

    /// The height to apply for `msg` posted from `origin`, or `None` if the
    /// message must be ignored.
    pub fn accept(&self, origin: &str, msg: &FrameSizeMessage) -> Option<u32> {
        if origin != self.origin {
            debug!(origin, expected = %self.origin, "frame-size message from foreign origin");
            return None;
        }
        if msg.kind.as_deref() != Some(self.marker.as_str()) {
            return None;
        }
        if is_truthy_id(msg.id.as_ref()) && msg.id.as_ref().and_then(Value::as_str) != Some(self.frame_id.as_str()) {
            debug!(id = ?msg.id, expected = %self.frame_id, "frame-size message for another frame");
            return None;
        }
        Some(self.clamp_height(msg.height.as_ref()))
    }

    /// Validate a relayed report and write the height style.
    pub fn apply(&self, report: &FrameSizeReport) -> Option<u32> {
        let msg: FrameSizeMessage = match &report.data {
            Value::Object(_) => serde_json::from_value(report.data.clone()).ok()?,
            _ => return None,
        };
        let height = self.accept(&report.origin, &msg)?;
        if let Some(slot) = &self.slot {
            slot.replace(format!(
                "<style>#{id}{{height:{height}px}}</style>",
                id = self.frame_id
            ));
        }
        Some(height)
    }
}
