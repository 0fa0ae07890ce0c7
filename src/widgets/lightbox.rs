//! # Widget Component: Lightbox Overlay
//!
//! ## Responsibility
//! Full-screen overlay showing one image and its caption.
//!
//! ## Guarantees
//! - Closes on the close control, on the backdrop itself, or on Escape while open
//! - Clicks on the image never close it
//! - Page scroll is locked exactly while the overlay is open
//! - Closing clears the image source so in-flight loads stop

use serde::Serialize;

use crate::sanitize::{escape_html, sanitize_url};

/// Where inside the overlay a click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The dedicated close control.
    CloseControl,
    /// The overlay background around the image.
    Backdrop,
    /// The image (or caption) itself.
    Image,
}

impl ClickTarget {
    /// Parse a target name as sent by the page (`close`, `backdrop`, `image`).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "close" => Some(Self::CloseControl),
            "backdrop" => Some(Self::Backdrop),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Keys the page forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Escape.
    Escape,
    /// Left arrow.
    ArrowLeft,
    /// Right arrow.
    ArrowRight,
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Escape" => Some(Self::Escape),
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            _ => None,
        }
    }
}

/// Overlay state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lightbox {
    active: bool,
    src: String,
    caption: String,
}

impl Lightbox {
    /// Closed overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `src` with `caption`. Both are raw values; they are guarded at render.
    pub fn open(&mut self, src: &str, caption: &str) {
        self.src = src.to_string();
        self.caption = caption.to_string();
        self.active = true;
    }

    /// Hide the overlay and drop the image source.
    pub fn close(&mut self) {
        self.active = false;
        self.src.clear();
    }

    /// Handle a click; returns `true` if the overlay closed.
    pub fn click(&mut self, target: ClickTarget) -> bool {
        if !self.active || target == ClickTarget::Image {
            return false;
        }
        self.close();
        true
    }

    /// Handle a key; returns `true` if it was consumed.
    pub fn key(&mut self, key: Key) -> bool {
        if self.active && key == Key::Escape {
            self.close();
            return true;
        }
        false
    }

    /// Whether the overlay is showing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether page scrolling is suppressed.
    pub fn scroll_locked(&self) -> bool {
        self.active
    }

    /// Current image source (empty when closed).
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Current caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Overlay markup.
    pub fn render(&self) -> String {
        let class = if self.active { "lightbox active" } else { "lightbox" };
        let caption = escape_html(&self.caption);
        format!(
            r#"<div class="{class}" data-scroll-lock="{lock}" role="dialog" aria-modal="true"><button class="lightbox-close" aria-label="Close" data-lightbox-click="close">&times;</button><img id="lightbox-image" src="{src}" alt="{caption}" data-lightbox-click="image"><p id="lightbox-caption">{caption}</p></div>"#,
            lock = self.scroll_locked(),
            src = sanitize_url(&self.src),
        )
    }
}
