//! # Widget Component: Carousel State
//!
//! ## Responsibility
//! Navigation state for the two carousel variants: the single-slide gallery
//! ([`SlideCarousel`]) and the horizontally scrolled news strip
//! ([`StripCarousel`]).
//!
//! ## Guarantees
//! - The current index is always in `[0, len)`, or the carousel is empty
//! - Replacing the items resets the index to 0
//! - Slide navigation wraps modulo length; strip navigation is bounded
//!
//! ## NOT Responsible For
//! - Timers (the owning widget runs auto-advance)
//! - Rendering

/// Single-slide carousel: exactly one item shown, chosen by index.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideCarousel<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> Default for SlideCarousel<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: 0,
        }
    }
}

impl<T> SlideCarousel<T> {
    /// Empty carousel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sequence and return to the first item.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.index = 0;
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the shown item.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The shown item, if any.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    /// Show item `index`. Out-of-range requests are ignored and return `false`.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.index = index;
        true
    }

    /// Advance one item, wrapping to the first.
    pub fn next(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.go_to((self.index + 1) % self.items.len())
    }

    /// Go back one item, wrapping to the last.
    pub fn prev(&mut self) -> bool {
        let len = self.items.len();
        if len == 0 {
            return false;
        }
        self.go_to((self.index + len - 1) % len)
    }
}

/// Horizontally scrolled strip: position is the index of the leftmost item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripCarousel {
    len: usize,
    index: usize,
}

impl StripCarousel {
    /// Strip over `len` items, scrolled to the start.
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    /// New item count; scroll back to the start.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = 0;
    }

    /// Leftmost visible item.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Item count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the strip has no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether "prev" is enabled.
    pub fn can_prev(&self) -> bool {
        self.index > 0
    }

    /// Whether "next" is enabled. The trailing item is usually partially
    /// visible already, so scrolling stops two items before the end.
    pub fn can_next(&self) -> bool {
        self.index + 2 < self.len
    }

    /// Scroll one item forward.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Scroll one item back.
    pub fn prev(&mut self) -> bool {
        if !self.can_prev() {
            return false;
        }
        self.index -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> SlideCarousel<u32> {
        let mut c = SlideCarousel::new();
        c.replace(vec![10, 20, 30, 40, 50]);
        c
    }

    #[test]
    fn test_next_five_times_wraps_to_start() {
        let mut c = five();
        for _ in 0..5 {
            assert!(c.next());
        }
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_prev_from_start_goes_to_last() {
        let mut c = five();
        assert!(c.prev());
        assert_eq!(c.index(), 4);
        assert_eq!(c.current(), Some(&50));
    }

    #[test]
    fn test_go_to_out_of_range_is_ignored() {
        let mut c = five();
        c.go_to(2);
        assert!(!c.go_to(5));
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn test_replace_resets_index() {
        let mut c = five();
        c.go_to(3);
        c.replace(vec![1, 2]);
        assert_eq!(c.index(), 0);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_empty_carousel_has_no_current() {
        let mut c: SlideCarousel<u32> = SlideCarousel::new();
        assert!(c.current().is_none());
        assert!(!c.next());
        assert!(!c.prev());
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_strip_disables_next_two_before_end() {
        let mut s = StripCarousel::new(6);
        assert!(!s.can_prev());
        let mut steps = 0;
        while s.next() {
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert_eq!(s.index(), 4);
        assert!(!s.can_next());
        assert!(s.can_prev());
    }

    #[test]
    fn test_strip_with_one_item_cannot_move() {
        let mut s = StripCarousel::new(1);
        assert!(!s.can_next());
        assert!(!s.next());
        assert!(!s.prev());
    }

    #[test]
    fn test_strip_reset_returns_to_start() {
        let mut s = StripCarousel::new(6);
        s.next();
        s.reset(3);
        assert_eq!(s.index(), 0);
        assert_eq!(s.len(), 3);
    }
}
