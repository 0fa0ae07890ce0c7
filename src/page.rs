//! # Module: Page Composition
//!
//! ## Responsibility
//! Own the page template, discover the view slots it declares, and splice
//! the current slot fragments into it.
//!
//! Slots are marked in the template as `{{slot:<id>}}`, placed inside the
//! element that receives live replacements (`data-slot="<id>"`).
//!
//! ## Guarantees
//! - The declared slot set is exactly the set of markers in the template
//! - Composition never fails: unknown or malformed markers are left as-is

use crate::view::Document;

/// The page served at `/`, compiled into the binary.
pub const PAGE_TEMPLATE: &str = include_str!("../static/index.html");

const OPEN: &str = "{{slot:";
const CLOSE: &str = "}}";

/// Slot identifiers declared in `template`, in order of first appearance.
pub fn declared_slots(template: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        let id = after[..end].trim();
        if !id.is_empty() && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
        rest = &after[end + CLOSE.len()..];
    }
    ids
}

/// A document declaring every slot of `template`.
pub fn document_for(template: &str) -> Document {
    Document::with_slots(declared_slots(template))
}

/// `template` with every marker replaced by the slot's current fragment.
pub fn compose(template: &str, doc: &Document) -> String {
    let mut out = String::with_capacity(template.len() + 4096);
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };
        let id = after[..end].trim();
        match doc.fragment(id) {
            Some(html) => out.push_str(&html),
            None => out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]),
        }
        rest = &after[end + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}
