//! Resolved matches and the navigation cursor over them

use crate::index::Span;

/// Spans of the selected nodes plus the index of the current one.
///
/// Navigation wraps around at both ends and does nothing on an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    spans: Vec<Span>,
    current: usize,
}

impl MatchSet {
    pub fn new(spans: Vec<Span>) -> Self {
        MatchSet { spans, current: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Index of the current match, None when there are no matches
    pub fn current_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.current)
    }

    pub fn current(&self) -> Option<Span> {
        self.spans.get(self.current).copied()
    }

    /// Advance to the next match, wrapping to the first
    pub fn next(&mut self) -> Option<Span> {
        if !self.is_empty() {
            self.current = (self.current + 1) % self.len();
        }
        self.current()
    }

    /// Step back to the previous match, wrapping to the last
    pub fn previous(&mut self) -> Option<Span> {
        if !self.is_empty() {
            self.current = (self.current + self.len() - 1) % self.len();
        }
        self.current()
    }

    /// `"i/N"` with a 1-based `i`; empty when there are no matches
    pub fn indicator(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.current + 1, self.len())
        }
    }

    /// Whether next/previous controls should be enabled
    #[inline]
    pub fn is_navigable(&self) -> bool {
        !self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(n: usize) -> MatchSet {
        MatchSet::new((0..n).map(|i| Span::new(i * 10, i * 10 + 5)).collect())
    }

    #[test]
    fn test_empty_set_is_inert() {
        let mut m = MatchSet::default();
        assert_eq!(m.next(), None);
        assert_eq!(m.previous(), None);
        assert_eq!(m.current_index(), None);
        assert_eq!(m.indicator(), "");
        assert!(!m.is_navigable());
    }

    #[test]
    fn test_wraparound() {
        let mut m = set(3);
        assert_eq!(m.current(), Some(Span::new(0, 5)));
        assert_eq!(m.previous(), Some(Span::new(20, 25)));
        assert_eq!(m.indicator(), "3/3");
        assert_eq!(m.next(), Some(Span::new(0, 5)));
        assert_eq!(m.indicator(), "1/3");
        m.next();
        assert_eq!(m.current_index(), Some(1));
    }

    #[test]
    fn test_single_match_stays_put() {
        let mut m = set(1);
        m.next();
        m.previous();
        assert_eq!(m.current_index(), Some(0));
        assert_eq!(m.indicator(), "1/1");
    }

    proptest! {
        #[test]
        fn prop_next_then_previous_is_identity(n in 1usize..20, steps in 0usize..50) {
            let mut m = set(n);
            for _ in 0..steps {
                m.next();
            }
            prop_assert_eq!(m.current_index(), Some(steps % n));
            for _ in 0..steps {
                m.previous();
            }
            prop_assert_eq!(m.current_index(), Some(0));
        }

        #[test]
        fn prop_full_cycle_returns_home(n in 1usize..20, start in 0usize..20) {
            let mut m = set(n);
            for _ in 0..start {
                m.next();
            }
            let home = m.current_index();
            for _ in 0..n {
                m.previous();
            }
            prop_assert_eq!(m.current_index(), home);
        }
    }
}
