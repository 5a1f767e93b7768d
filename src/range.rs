use std::fmt;
use std::ops::{Add, Range, Sub};

/// A half-open `[start, end)` interval over a line-indexed sequence.
///
/// Bounds are signed because search windows are allowed to start before the
/// first line of a file (see [`MatchMatrix::working_range`](crate::MatchMatrix::working_range)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LineRange {
    /// The first line in the range (inclusive).
    pub start: isize,
    /// One past the last line in the range (exclusive).
    pub end: isize,
}

impl LineRange {
    /// Creates a range from its inclusive start and exclusive end.
    pub const fn new(start: isize, end: isize) -> Self {
        Self { start, end }
    }

    /// Creates a range from a start index and a length.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::LineRange;
    /// let range = LineRange::from_len(3, 2);
    /// assert_eq!(range, LineRange::new(3, 5));
    /// assert_eq!(range.to_string(), "[3,5)");
    /// ```
    pub fn from_len(start: usize, len: usize) -> Self {
        Self::new(start as isize, (start + len) as isize)
    }

    /// The number of lines in the range. Inverted ranges have a length of zero.
    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The last line in the range (`end - 1`).
    pub fn last(&self) -> isize {
        self.end - 1
    }

    pub fn with_len(self, len: usize) -> Self {
        Self::new(self.start, self.start + len as isize)
    }

    pub fn with_last(self, last: isize) -> Self {
        Self::new(self.start, last + 1)
    }

    pub fn contains(&self, index: isize) -> bool {
        self.start <= index && index < self.end
    }

    /// Returns `true` if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if the two ranges share at least one line.
    pub fn intersects(&self, other: LineRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Subtracts a collection of ranges from this one, returning the non-empty
    /// pieces that remain, in order.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::LineRange;
    /// let file = LineRange::new(0, 20);
    /// let pieces = file.except([LineRange::new(12, 15), LineRange::new(2, 4)]);
    /// assert_eq!(
    ///     pieces,
    ///     vec![LineRange::new(0, 2), LineRange::new(4, 12), LineRange::new(15, 20)]
    /// );
    /// ```
    pub fn except(&self, ranges: impl IntoIterator<Item = LineRange>) -> Vec<LineRange> {
        let mut sorted: Vec<LineRange> = ranges.into_iter().collect();
        sorted.sort_unstable_by_key(|r| r.start);

        let mut pieces = Vec::with_capacity(sorted.len() + 1);
        let mut start = self.start;
        for range in sorted {
            if range.start > start {
                pieces.push(LineRange::new(start, range.start.min(self.end)));
            }
            start = start.max(range.end);
        }
        if self.end > start {
            pieces.push(LineRange::new(start, self.end));
        }
        pieces.retain(|r| !r.is_empty());
        pieces
    }

    /// Converts the range into a slice index range.
    ///
    /// Panics if the range starts before zero.
    pub fn as_usize(&self) -> Range<usize> {
        assert!(self.start >= 0, "range {self} cannot index a slice");
        self.start as usize..self.end.max(self.start) as usize
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}

impl Add<isize> for LineRange {
    type Output = LineRange;

    fn add(self, rhs: isize) -> LineRange {
        LineRange::new(self.start + rhs, self.end + rhs)
    }
}

impl Sub<isize> for LineRange {
    type Output = LineRange;

    fn sub(self, rhs: isize) -> LineRange {
        LineRange::new(self.start - rhs, self.end - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_requires_a_shared_line() {
        let a = LineRange::new(2, 5);
        assert!(a.intersects(LineRange::new(4, 8)));
        assert!(a.intersects(LineRange::new(0, 3)));
        assert!(!a.intersects(LineRange::new(5, 8)));
        assert!(!a.intersects(LineRange::new(0, 2)));
    }

    #[test]
    fn except_handles_ranges_at_the_edges() {
        let file = LineRange::new(0, 10);
        assert_eq!(
            file.except([LineRange::new(0, 3), LineRange::new(8, 10)]),
            vec![LineRange::new(3, 8)]
        );
        assert!(file.except([LineRange::new(0, 10)]).is_empty());
        assert_eq!(file.except(Vec::new()), vec![file]);
    }

    #[test]
    fn translation_moves_both_bounds() {
        let r = LineRange::new(3, 6);
        assert_eq!(r + 2, LineRange::new(5, 8));
        assert_eq!(r - 3, LineRange::new(0, 3));
        assert_eq!(r.with_last(9), LineRange::new(3, 10));
        assert_eq!(r.len(), 3);
        assert!(r.contains_range(LineRange::new(4, 6)));
        assert!(!r.contains(6));
    }
}
