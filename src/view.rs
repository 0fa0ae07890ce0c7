//! # Module: Document View Tree
//!
//! ## Responsibility
//! Hold the current HTML fragment of every named view slot on the page and
//! hand out exclusive write capabilities ([`Slot`]) to widgets.
//!
//! ## Guarantees
//! - A slot can be claimed at most once: no two widgets write the same sub-tree
//! - Only declared slots can be claimed; a widget whose required slots are
//!   missing is never constructed
//! - Every effective replacement is published to subscribers; writing the
//!   same content twice publishes nothing
//!
//! ## NOT Responsible For
//! - Sanitizing content (callers pass already-sanitized markup, or use
//!   [`Slot::set_text`])
//! - Composing the full page (that belongs to `page`)

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::sanitize::escape_html;

/// Capacity of the slot-update broadcast channel.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A published slot replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotUpdate {
    /// Slot identifier.
    pub slot: String,
    /// New inner HTML of the slot.
    pub html: String,
}

#[derive(Debug, Default)]
struct SlotState {
    html: String,
    claimed: bool,
}

struct DocumentInner {
    slots: RwLock<BTreeMap<String, SlotState>>,
    updates: broadcast::Sender<SlotUpdate>,
}

/// The shared view tree. Cheap to clone (`Arc`-backed).
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("slots", &self.slot_ids())
            .finish()
    }
}

impl Document {
    /// Create a document declaring the given slot identifiers.
    ///
    /// # Panics
    ///
    /// This function never panics.
    pub fn with_slots<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = ids
            .into_iter()
            .map(|id| (id.into(), SlotState::default()))
            .collect();
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DocumentInner {
                slots: RwLock::new(slots),
                updates,
            }),
        }
    }

    /// Claim the write capability for slot `id`.
    ///
    /// Returns `None` if the slot was never declared or is already owned.
    pub fn claim(&self, id: &str) -> Option<Slot> {
        let mut slots = self.inner.slots.write();
        let state = slots.get_mut(id)?;
        if state.claimed {
            tracing::warn!(slot = id, "slot already claimed by another widget");
            return None;
        }
        state.claimed = true;
        Some(Slot {
            id: id.to_string(),
            doc: self.clone(),
        })
    }

    /// Current inner HTML of slot `id`, or `None` if undeclared.
    pub fn fragment(&self, id: &str) -> Option<String> {
        self.inner.slots.read().get(id).map(|s| s.html.clone())
    }

    /// All declared slot identifiers, sorted.
    pub fn slot_ids(&self) -> Vec<String> {
        self.inner.slots.read().keys().cloned().collect()
    }

    /// Subscribe to slot replacements.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotUpdate> {
        self.inner.updates.subscribe()
    }

    fn write(&self, id: &str, html: String) {
        let changed = {
            let mut slots = self.inner.slots.write();
            match slots.get_mut(id) {
                Some(state) if state.html != html => {
                    state.html = html.clone();
                    true
                }
                _ => false,
            }
        };
        if changed {
            // No subscribers is fine: the page is composed from current state.
            let _ = self.inner.updates.send(SlotUpdate {
                slot: id.to_string(),
                html,
            });
        }
    }
}

/// Exclusive write capability for one view slot.
///
/// Not `Clone`: ownership of a `Slot` is ownership of the sub-tree.
#[derive(Debug)]
pub struct Slot {
    id: String,
    doc: Document,
}

impl Slot {
    /// Slot identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the slot's inner HTML with already-sanitized markup.
    pub fn replace(&self, html: impl Into<String>) {
        self.doc.write(&self.id, html.into());
    }

    /// Replace the slot's content with plain text (escaped).
    pub fn set_text(&self, text: &str) {
        self.doc.write(&self.id, escape_html(text));
    }

    /// Empty the slot.
    pub fn clear(&self) {
        self.doc.write(&self.id, String::new());
    }

    /// Current inner HTML of this slot.
    pub fn html(&self) -> String {
        self.doc.fragment(&self.id).unwrap_or_default()
    }
}
