//! # Module: Poll-Render Widgets
//!
//! ## Responsibility
//! One independent fetch→sanitize→render unit per dashboard section. Each
//! widget owns its state and the [`Slot`](crate::view::Slot)s it writes;
//! nothing is shared between widgets except the read-only mission document
//! used as a static fallback.
//!
//! ## Guarantees
//! - A widget is only constructed when its required slots exist
//! - Every external value is escaped or URL-guarded before interpolation
//! - No failure is fatal: each widget degrades to a fallback rendering or an
//!   inline status string
//! - Missing optional fields render as [`PLACEHOLDER`]

pub mod carousel;
pub mod clock;
pub mod gallery;
pub mod lightbox;
pub mod mission;
pub mod news;
pub mod projects;
pub mod telemetry;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::sanitize::escape_html;

/// Rendered in place of a missing value.
pub const PLACEHOLDER: &str = "\u{2014}";

/// A widget whose content is refreshed from the network on a schedule.
#[async_trait]
pub trait PollWidget: Send + Sync + 'static {
    /// Short name used in logs, metrics and task names.
    fn name(&self) -> &'static str;

    /// Fetch and re-render. Never fails: errors degrade inside the widget.
    async fn refresh(&self);
}

/// Escape `value`, or return [`PLACEHOLDER`] when it is absent or blank.
pub fn text_or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => escape_html(v),
        _ => PLACEHOLDER.to_string(),
    }
}

/// `deserialize_with` target: an explicit `null` decodes as `T::default()`.
///
/// Pair with `#[serde(default)]` so absent keys take the same path.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
