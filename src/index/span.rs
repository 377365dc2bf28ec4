//! Span - half-open byte range into the source text
//!
//! `start` is the first byte of the range, `end` is one past the last.

/// A byte range `[start, end)` into the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    /// Byte offset of the first byte
    pub start: usize,
    /// Byte offset one past the last byte
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span covers nothing
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check whether the two spans share at least one byte
    #[inline]
    pub const fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Extract the covered text, or None when the span is out of bounds or
    /// does not fall on char boundaries.
    #[inline]
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_basic() {
        let span = Span::new(5, 15);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_span_empty() {
        assert!(Span::new(4, 4).is_empty());
        assert!(Span::new(4, 2).is_empty());
        assert_eq!(Span::new(4, 2).len(), 0);
    }

    #[test]
    fn test_span_slice() {
        let text = "hello world";
        assert_eq!(Span::new(6, 11).slice(text), Some("world"));
        assert_eq!(Span::new(6, 12).slice(text), None);
    }

    #[test]
    fn test_span_slice_rejects_split_char() {
        let text = "h\u{e9}llo";
        assert_eq!(Span::new(0, 2).slice(text), None);
        assert_eq!(Span::new(0, 3).slice(text), Some("h\u{e9}"));
    }

    #[test]
    fn test_overlaps() {
        let outer = Span::new(0, 10);
        let inner = Span::new(2, 5);
        let beside = Span::new(10, 12);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(!outer.overlaps(&beside));
    }
}
