//! Word-level fuzzy line matching.

use crate::matrix::{MatchMatrix, DEFAULT_MAX_OFFSET};
use crate::range::LineRange;
use crate::token::{Token, WordTokens};
use log::trace;

/// The default score a placement must exceed to be accepted.
pub const DEFAULT_MIN_MATCH_SCORE: f32 = 0.5;

/// Fills the gaps an exact matcher leaves by aligning lines that changed
/// slightly.
///
/// Lines are compared as word-token sequences (see
/// [`TokenMapper::tokenize`](crate::TokenMapper::tokenize)) and aligned with a
/// [`MatchMatrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyLineMatcher {
    /// Maximum number of lines a match may skip between two matched lines.
    pub max_match_offset: usize,
    /// A placement must score strictly above this to be accepted.
    pub min_match_score: f32,
}

impl Default for FuzzyLineMatcher {
    fn default() -> Self {
        Self {
            max_match_offset: DEFAULT_MAX_OFFSET,
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
        }
    }
}

impl FuzzyLineMatcher {
    pub fn new(max_match_offset: usize, min_match_score: f32) -> Self {
        Self {
            max_match_offset,
            min_match_score,
        }
    }

    /// Fills unmatched entries of `matches` by fuzzy matching each gap between
    /// matched lines.
    ///
    /// `matches` has one entry per line of `words1`; existing entries are left
    /// untouched.
    pub fn match_lines_by_words(
        &self,
        matches: &mut [Option<usize>],
        words1: &[WordTokens],
        words2: &[WordTokens],
    ) {
        for (range1, range2) in unmatched_ranges(matches, words2.len()) {
            if range1.is_empty() || range2.is_empty() {
                continue;
            }

            let (r1, r2) = (range1.as_usize(), range2.as_usize());
            trace!("fuzzy gap {range1} x {range2}");
            let aligned = self.align(&words1[r1.clone()], &words2[r2.clone()]);
            for (i, m) in aligned.into_iter().enumerate() {
                if let Some(m) = m {
                    matches[r1.start + i] = Some(r2.start + m);
                }
            }
        }
    }

    /// Finds the best placement of `pattern` in `search`.
    ///
    /// Returns one entry per pattern line: the matched index in `search`, or
    /// `None`. All entries are `None` if no placement scores above
    /// [`min_match_score`](Self::min_match_score).
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::{FuzzyLineMatcher, TokenMapper};
    /// let mut mapper = TokenMapper::new();
    /// let pattern = mapper.tokenize_lines(&["let x = 1;", "let y = 2;"]);
    /// let search = mapper.tokenize_lines(&["fn main() {", "let x = 10;", "let y = 2;", "}"]);
    ///
    /// let aligned = FuzzyLineMatcher::default().align(&pattern, &search);
    /// assert_eq!(aligned, vec![Some(1), Some(2)]);
    /// ```
    pub fn align(&self, pattern: &[WordTokens], search: &[WordTokens]) -> Vec<Option<usize>> {
        if search.len() < pattern.len() {
            let mut inverted = vec![None; pattern.len()];
            for (i, m) in self.align(search, pattern).into_iter().enumerate() {
                if let Some(m) = m {
                    inverted[m] = Some(i);
                }
            }
            return inverted;
        }

        if pattern.is_empty() {
            return Vec::new();
        }

        let mut best_score = self.min_match_score;
        let mut best_path = None;

        let mut mm = MatchMatrix::over(pattern, search, self.max_match_offset);
        let mut loc = mm.working_range().start;
        while let Some(score) = mm.match_at(loc) {
            if score > best_score {
                best_score = score;
                best_path = Some(mm.path());
            }
            loc += 1;
        }

        best_path.unwrap_or_else(|| vec![None; pattern.len()])
    }
}

/// Similarity of two word-token lines in `[0, 1]`.
///
/// Identical lines score 1. Otherwise the score falls linearly with edit
/// distance and reaches 0 once the distance is half the longer line.
///
/// # Example
///
/// ```
/// # use driftpatch::match_lines;
/// assert_eq!(match_lines(&[1, 2, 3, 4], &[1, 2, 3, 4]), 1.0);
/// assert_eq!(match_lines(&[1, 2, 3, 4], &[1, 2, 3, 5]), 0.5);
/// assert_eq!(match_lines(&[1, 2, 3, 4], &[1, 2, 6, 5]), 0.0);
/// ```
pub fn match_lines(a: &[Token], b: &[Token]) -> f32 {
    let distance = levenshtein(a, b);
    if distance == 0 {
        return 1.0;
    }

    let half = a.len().max(b.len()) as f32 / 2.0;
    (1.0 - distance as f32 / half).max(0.0)
}

/// Edit distance between two token sequences.
pub fn levenshtein(s: &[Token], t: &[Token]) -> usize {
    if s == t {
        return 0;
    }
    if s.is_empty() {
        return t.len();
    }
    if t.is_empty() {
        return s.len();
    }

    let mut prev: Vec<usize> = (0..=t.len()).collect();
    let mut curr = vec![0; t.len() + 1];
    for (i, &sc) in s.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &tc) in t.iter().enumerate() {
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            let substitute = prev[j] + usize::from(sc != tc);
            curr[j + 1] = delete.min(insert).min(substitute);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[t.len()]
}

/// Splits a match array into the gaps between matched lines.
///
/// Each pair holds a run of unmatched lines on the first side and the lines on
/// the second side between the surrounding matches. Either range may be empty.
///
/// # Example
///
/// ```
/// # use driftpatch::{unmatched_ranges, LineRange};
/// let matches = [Some(0), None, None, Some(2), Some(3)];
/// assert_eq!(
///     unmatched_ranges(&matches, 6),
///     vec![
///         (LineRange::new(1, 3), LineRange::new(1, 2)),
///         (LineRange::new(5, 5), LineRange::new(4, 6)),
///     ]
/// );
/// ```
pub fn unmatched_ranges(matches: &[Option<usize>], len2: usize) -> Vec<(LineRange, LineRange)> {
    let len1 = matches.len();
    let (mut start1, mut start2) = (0, 0);
    let mut ranges = Vec::new();

    loop {
        let end1 = matches[start1..]
            .iter()
            .position(Option::is_some)
            .map_or(len1, |p| start1 + p);
        let end2 = matches.get(end1).copied().flatten().unwrap_or(len2);

        if end1 != start1 || end2 != start2 {
            ranges.push((
                LineRange::new(start1 as isize, end1 as isize),
                LineRange::new(start2 as isize, end2 as isize),
            ));
            start1 = end1;
            start2 = end2;
        } else {
            start1 += 1;
            start2 += 1;
        }

        if start1 >= len1 && start2 >= len2 {
            return ranges;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenMapper;

    #[test]
    fn levenshtein_handles_empty_sides() {
        assert_eq!(levenshtein(&[], &[1, 2]), 2);
        assert_eq!(levenshtein(&[1, 2, 3], &[]), 3);
        assert_eq!(levenshtein(&[1, 2, 3], &[1, 3]), 1);
        assert_eq!(levenshtein(&[1, 2, 3], &[3, 2, 1]), 2);
    }

    #[test]
    fn match_lines_decreases_with_distance() {
        let base = [1, 2, 3, 4, 5, 6];
        let mut previous = match_lines(&base, &base);
        assert_eq!(previous, 1.0);
        for changed in 1..=4 {
            let mut other = base;
            for t in other.iter_mut().take(changed) {
                *t += 100;
            }
            let score = match_lines(&base, &other);
            assert!(score < previous || score == 0.0);
            previous = score;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn align_rejects_unrelated_lines() {
        let mut mapper = TokenMapper::new();
        let pattern = mapper.tokenize_lines(&["alpha beta", "gamma delta"]);
        let search = mapper.tokenize_lines(&["one two three", "four", "five six"]);
        let matcher = FuzzyLineMatcher::default();
        assert_eq!(matcher.align(&pattern, &search), vec![None, None]);
    }

    #[test]
    fn align_swaps_roles_when_search_is_shorter() {
        let mut mapper = TokenMapper::new();
        let long = mapper.tokenize_lines(&["header", "let a = 1;", "let b = 2;", "footer"]);
        let short = mapper.tokenize_lines(&["let a = 1;", "let b = 22;"]);
        let matcher = FuzzyLineMatcher::default();

        assert_eq!(matcher.align(&long, &short), vec![None, Some(0), Some(1), None]);
        assert_eq!(matcher.align(&short, &long), vec![Some(1), Some(2)]);
    }

    #[test]
    fn fills_gaps_between_exact_matches() {
        let mut mapper = TokenMapper::new();
        let a = mapper.tokenize_lines(&["fn f() {", "    call(1, 2);", "}"]);
        let b = mapper.tokenize_lines(&["fn f() {", "    call(1, 3);", "}"]);
        let mut matches = vec![Some(0), None, Some(2)];

        FuzzyLineMatcher::default().match_lines_by_words(&mut matches, &a, &b);
        assert_eq!(matches, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn unmatched_ranges_covers_leading_and_trailing_gaps() {
        let matches = [None, Some(2), None];
        assert_eq!(
            unmatched_ranges(&matches, 3),
            vec![
                (LineRange::new(0, 1), LineRange::new(0, 2)),
                (LineRange::new(2, 3), LineRange::new(3, 3)),
            ]
        );
        assert!(unmatched_ranges(&[], 0).is_empty());
    }
}
