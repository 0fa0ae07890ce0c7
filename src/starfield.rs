//! # Module: Decorative Starfield
//!
//! ## Responsibility
//! Reseed a fixed number of randomly placed points on every resize and draw
//! them, over a faint radial vignette, as an SVG fragment.
//!
//! ## Guarantees
//! - One redraw per resize; there is no animation loop
//! - Device pixel ratio is capped at 2; missing or nonsensical ratios are 1
//! - Randomness is injectable so tests can reseed deterministically
//!
//! ## NOT Responsible For
//! - Observing the viewport (the page reports resizes)

use std::fmt::Write as _;

use parking_lot::Mutex;
use rand::Rng;

use crate::view::{Document, Slot};

/// Slot the starfield is drawn into.
pub const STARFIELD_SLOT: &str = "stars";

/// Highest device pixel ratio honoured.
pub const MAX_DPR: f64 = 2.0;

/// Star tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarColor {
    /// Cool accent.
    Cyan,
    /// Status accent.
    Green,
    /// Default.
    White,
}

impl StarColor {
    fn rgba(self, alpha: f64) -> String {
        let (r, g, b) = match self {
            Self::Cyan => (102, 217, 255),
            Self::Green => (69, 255, 154),
            Self::White => (231, 242, 255),
        };
        format!("rgba({r},{g},{b},{alpha:.3})")
    }
}

/// One point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    /// Horizontal position in CSS pixels.
    pub x: f64,
    /// Vertical position in CSS pixels.
    pub y: f64,
    /// Depth in `[0.2, 1.1)`.
    pub z: f64,
    /// Base size in `[0.6, 2.4)`.
    pub size: f64,
    /// Tint.
    pub color: StarColor,
}

impl Star {
    fn seed<R: Rng>(rng: &mut R, width: f64, height: f64) -> Self {
        let color = if rng.gen::<f64>() < 0.22 {
            StarColor::Cyan
        } else if rng.gen::<f64>() < 0.15 {
            StarColor::Green
        } else {
            StarColor::White
        };
        Self {
            x: rng.gen::<f64>() * width,
            y: rng.gen::<f64>() * height,
            z: 0.2 + rng.gen::<f64>() * 0.9,
            size: 0.6 + rng.gen::<f64>() * 1.8,
            color,
        }
    }

    /// Drawn radius.
    pub fn radius(&self) -> f64 {
        self.size * self.z
    }

    /// Drawn opacity.
    pub fn alpha(&self) -> f64 {
        0.16 + self.z * 0.38
    }
}

fn sane(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Effective device pixel ratio.
pub fn effective_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr.min(MAX_DPR)
    } else {
        1.0
    }
}

/// Star set and the surface it was seeded for.
#[derive(Debug, Clone, PartialEq)]
pub struct Starfield {
    star_count: usize,
    width: f64,
    height: f64,
    dpr: f64,
    stars: Vec<Star>,
}

impl Starfield {
    /// Empty field that seeds `star_count` points per resize.
    pub fn new(star_count: usize) -> Self {
        Self {
            star_count,
            width: 0.0,
            height: 0.0,
            dpr: 1.0,
            stars: Vec::new(),
        }
    }

    /// Reseed for a `width` × `height` surface and return the drawing.
    pub fn resize<R: Rng>(&mut self, width: f64, height: f64, dpr: f64, rng: &mut R) -> String {
        self.width = sane(width);
        self.height = sane(height);
        self.dpr = effective_dpr(dpr);
        self.stars = (0..self.star_count)
            .map(|_| Star::seed(rng, self.width, self.height))
            .collect();
        self.render()
    }

    /// Seeded points.
    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    /// Backing-store size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.width * self.dpr).floor() as u32,
            (self.height * self.dpr).floor() as u32,
        )
    }

    /// SVG drawing of the current field.
    pub fn render(&self) -> String {
        let (w, h) = (self.width, self.height);
        let (bw, bh) = self.backing_size();
        let mut svg = String::with_capacity(128 + self.stars.len() * 80);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" class="starfield" width="{w}" height="{h}" viewBox="0 0 {w} {h}" data-backing="{bw}x{bh}" aria-hidden="true">"#
        );
        let _ = write!(
            svg,
            r##"<defs><radialGradient id="vignette" gradientUnits="userSpaceOnUse" cx="{cx:.1}" cy="{cy:.1}" fx="{cx:.1}" fy="{cy:.1}" fr="50" r="{r:.1}"><stop offset="0" stop-color="#000" stop-opacity="0"/><stop offset="1" stop-color="#000" stop-opacity="0.55"/></radialGradient></defs><rect width="{w}" height="{h}" fill="url(#vignette)"/>"##,
            cx = w * 0.5,
            cy = h * 0.35,
            r = w.max(h) * 0.75,
        );
        for star in &self.stars {
            let _ = write!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.3}" fill="{}"/>"#,
                star.x,
                star.y,
                star.radius(),
                star.color.rgba(star.alpha()),
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

/// The background drawing bound to its slot.
#[derive(Debug)]
pub struct StarfieldWidget {
    slot: Slot,
    field: Mutex<Starfield>,
}

impl StarfieldWidget {
    /// Claim the starfield slot; `None` if the page has none.
    pub fn claim(doc: &Document, star_count: usize) -> Option<Self> {
        Some(Self {
            slot: doc.claim(STARFIELD_SLOT)?,
            field: Mutex::new(Starfield::new(star_count)),
        })
    }

    /// Reseed and redraw for a new surface size.
    pub fn resize(&self, width: f64, height: f64, dpr: f64) {
        let svg = self.field.lock().resize(width, height, dpr, &mut rand::thread_rng());
        self.slot.replace(svg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resize_seeds_star_count_within_bounds() {
        let mut field = Starfield::new(170);
        let mut rng = StdRng::seed_from_u64(7);
        field.resize(1280.0, 720.0, 1.0, &mut rng);
        assert_eq!(field.stars().len(), 170);
        for star in field.stars() {
            assert!((0.0..1280.0).contains(&star.x));
            assert!((0.0..720.0).contains(&star.y));
            assert!((0.2..1.1).contains(&star.z));
            assert!((0.6..2.4).contains(&star.size));
            assert!((0.16..0.16 + 1.1 * 0.38).contains(&star.alpha()));
        }
    }

    #[test]
    fn test_same_seed_same_drawing() {
        let mut a = Starfield::new(20);
        let mut b = Starfield::new(20);
        let svg_a = a.resize(400.0, 300.0, 1.0, &mut StdRng::seed_from_u64(1));
        let svg_b = b.resize(400.0, 300.0, 1.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(svg_a, svg_b);
    }

    #[test]
    fn test_resize_reseeds() {
        let mut field = Starfield::new(20);
        let mut rng = StdRng::seed_from_u64(3);
        field.resize(400.0, 300.0, 1.0, &mut rng);
        let first = field.stars().to_vec();
        field.resize(400.0, 300.0, 1.0, &mut rng);
        assert_ne!(first, field.stars());
    }

    #[test]
    fn test_dpr_capped_and_defaulted() {
        assert_eq!(effective_dpr(3.0), 2.0);
        assert_eq!(effective_dpr(1.5), 1.5);
        assert_eq!(effective_dpr(0.0), 1.0);
        assert_eq!(effective_dpr(f64::NAN), 1.0);

        let mut field = Starfield::new(0);
        field.resize(100.5, 50.0, 3.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(field.backing_size(), (201, 100));
    }

    #[test]
    fn test_svg_has_vignette_and_one_circle_per_star() {
        let mut field = Starfield::new(12);
        let svg = field.resize(800.0, 400.0, 1.0, &mut StdRng::seed_from_u64(9));
        assert_eq!(svg.matches("<circle").count(), 12);
        assert!(svg.contains(r#"cx="400.0" cy="140.0""#));
        assert!(svg.contains(r#"r="600.0""#));
        assert!(svg.contains(r#"stop-opacity="0.55""#));
    }

    #[test]
    fn test_widget_writes_slot() {
        let doc = Document::with_slots([STARFIELD_SLOT]);
        let widget = StarfieldWidget::claim(&doc, 5).expect("test: declared");
        widget.resize(10.0, 10.0, 1.0);
        assert!(doc.fragment(STARFIELD_SLOT).unwrap_or_default().starts_with("<svg"));
    }
}
