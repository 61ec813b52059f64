//! Source ranges for parsed nodes.

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` byte range into the source text.
///
/// Only nodes produced by parsing carry a range; programmatically built
/// nodes have none unless one is explicitly copied over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    /// Byte offset of the first character (0-based)
    pub start: usize,

    /// Byte offset one past the last character
    pub end: usize,
}

impl Range {
    /// Create a new range. `end` is clamped so that it is never before `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no text (e.g. an implicit null).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the range.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: &Range) -> Range {
        Range::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_creation() {
        let range = Range::new(10, 18);
        assert_eq!(range.start, 10);
        assert_eq!(range.end, 18);
        assert_eq!(range.len(), 8);
        assert!(range.contains(10));
        assert!(!range.contains(18));
    }

    #[test]
    fn test_end_is_clamped() {
        let range = Range::new(5, 2);
        assert_eq!(range.end, 5);
        assert!(range.is_empty());
    }

    #[test]
    fn test_cover() {
        let a = Range::new(2, 4);
        let b = Range::new(8, 12);
        assert_eq!(a.cover(&b), Range::new(2, 12));
    }
}
