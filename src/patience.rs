//! Patience matching over line tokens.
//!
//! Only lines that are unique on both sides of a region are used as anchors, so
//! the alignment is precise but may leave gaps. Filling those gaps is the job of
//! [`FuzzyLineMatcher`](crate::FuzzyLineMatcher).

use crate::token::Token;
use log::trace;

/// Regions whose combined length is at or below this are not subdivided.
const MIN_SPLIT_SPAN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Unseen,
    Once(usize),
    Many,
}

impl Seen {
    fn record(self, index: usize) -> Seen {
        match self {
            Seen::Unseen => Seen::Once(index),
            _ => Seen::Many,
        }
    }
}

/// Aligns two token sequences.
///
/// Entry `i` of the result is the index in `b` matched to `a[i]`, or `None`.
/// Matched indices are strictly increasing.
///
/// # Example
///
/// ```
/// # use driftpatch::patience_match;
/// let a = [1, 2, 500, 3];
/// let b = [9, 500, 3];
/// assert_eq!(patience_match(&a, &b), vec![None, None, Some(1), Some(2)]);
/// ```
pub fn patience_match(a: &[Token], b: &[Token]) -> Vec<Option<usize>> {
    let table_len = a
        .iter()
        .chain(b)
        .max()
        .map_or(0, |&max| max as usize + 1);

    let mut matcher = PatienceMatcher {
        a,
        b,
        matches: vec![None; a.len()],
        seen_a: vec![Seen::Unseen; table_len],
        seen_b: vec![Seen::Unseen; table_len],
    };
    matcher.match_region(0, a.len(), 0, b.len());
    matcher.matches
}

struct PatienceMatcher<'a> {
    a: &'a [Token],
    b: &'a [Token],
    matches: Vec<Option<usize>>,
    seen_a: Vec<Seen>,
    seen_b: Vec<Seen>,
}

impl PatienceMatcher<'_> {
    fn match_region(
        &mut self,
        mut start1: usize,
        mut end1: usize,
        mut start2: usize,
        mut end2: usize,
    ) {
        loop {
            while start1 < end1 && start2 < end2 && self.a[start1] == self.b[start2] {
                self.matches[start1] = Some(start2);
                start1 += 1;
                start2 += 1;
            }
            while start1 < end1 && start2 < end2 && self.a[end1 - 1] == self.b[end2 - 1] {
                end1 -= 1;
                end2 -= 1;
                self.matches[end1] = Some(end2);
            }

            if start1 == end1 || start2 == end2 {
                return;
            }
            if (end1 - start1) + (end2 - start2) <= MIN_SPLIT_SPAN {
                return;
            }

            let anchors = self.unique_anchors(start1, end1, start2, end2);
            if anchors.is_empty() {
                return;
            }
            trace!(
                "patience: {} anchors in [{start1},{end1}) x [{start2},{end2})",
                anchors.len()
            );

            for (i, j) in anchors {
                self.match_region(start1, i, start2, j);
                self.matches[i] = Some(j);
                start1 = i + 1;
                start2 = j + 1;
            }
            // Lines that repeated before may be unique in what is left.
        }
    }

    /// Lines unique within both regions, reduced to the longest run whose
    /// positions increase on both sides.
    fn unique_anchors(
        &mut self,
        start1: usize,
        end1: usize,
        start2: usize,
        end2: usize,
    ) -> Vec<(usize, usize)> {
        for i in start1..end1 {
            let t = self.a[i] as usize;
            self.seen_a[t] = self.seen_a[t].record(i);
        }
        for j in start2..end2 {
            let t = self.b[j] as usize;
            if self.seen_a[t] != Seen::Unseen {
                self.seen_b[t] = self.seen_b[t].record(j);
            }
        }

        let mut pairs = Vec::new();
        for i in start1..end1 {
            let t = self.a[i] as usize;
            if let (Seen::Once(first), Seen::Once(j)) = (self.seen_a[t], self.seen_b[t]) {
                if first == i {
                    pairs.push((i, j));
                }
            }
        }

        for &t in &self.a[start1..end1] {
            self.seen_a[t as usize] = Seen::Unseen;
            self.seen_b[t as usize] = Seen::Unseen;
        }
        for &t in &self.b[start2..end2] {
            self.seen_b[t as usize] = Seen::Unseen;
        }

        longest_increasing(&pairs)
    }
}

/// Patience sort over the second element of each pair, which are distinct.
fn longest_increasing(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut piles: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = Vec::with_capacity(pairs.len());

    for (k, &(_, j)) in pairs.iter().enumerate() {
        let pile = piles.partition_point(|&top| pairs[top].1 < j);
        prev.push(pile.checked_sub(1).map(|p| piles[p]));
        if pile == piles.len() {
            piles.push(k);
        } else {
            piles[pile] = k;
        }
    }

    let mut result = Vec::with_capacity(piles.len());
    let mut cursor = piles.last().copied();
    while let Some(k) = cursor {
        result.push(pairs[k]);
        cursor = prev[k];
    }
    result.reverse();
    result
}
