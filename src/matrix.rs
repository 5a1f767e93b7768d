use crate::fuzzy::match_lines;
use crate::range::LineRange;
use crate::token::WordTokens;

/// The default maximum number of search lines a match may skip between two
/// consecutive pattern lines.
pub const DEFAULT_MAX_OFFSET: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    /// Similarity of this pattern line to the search line it sits over.
    score: f32,
    /// Score of the best path from this node to the end of the pattern.
    sum: f32,
    /// Offset row of the next node on the best path.
    next: Option<usize>,
}

/// Scores every placement of a pattern over a window of search lines.
///
/// The matrix has one row per offset `k` in `0..=max_offset`. Row `k` holds the
/// similarity of each pattern line `i` to search line `loc + k + i`. A path may
/// stay on a row, move to a higher row (skipping search lines, at a cost of 0.5
/// per line) or drop to a lower row (leaving pattern lines unmatched). The score
/// at `loc` is the best path sum averaged over the pattern length.
///
/// Sliding `loc` by one line reuses every row but one, so scanning a whole file
/// costs one row evaluation per position.
#[derive(Debug)]
pub struct MatchMatrix<'a> {
    pattern: &'a [WordTokens],
    search: &'a [WordTokens],
    range: LineRange,
    max_offset: usize,
    working_range: LineRange,
    rows: Vec<Vec<Node>>,
    pos: Option<isize>,
    first_node: usize,
}

impl<'a> MatchMatrix<'a> {
    /// Creates a matrix that places `pattern` anywhere within `range` of `search`.
    ///
    /// Panics if the pattern is empty.
    pub fn new(
        pattern: &'a [WordTokens],
        search: &'a [WordTokens],
        max_offset: usize,
        range: LineRange,
    ) -> Self {
        assert!(!pattern.is_empty(), "cannot match an empty pattern");

        let working_range = LineRange::new(
            range.start - max_offset as isize,
            range.end - pattern.len() as isize + 1,
        );
        Self {
            pattern,
            search,
            range,
            max_offset,
            working_range,
            rows: vec![vec![Node::default(); pattern.len()]; max_offset + 1],
            pos: None,
            first_node: 0,
        }
    }

    /// Creates a matrix over all of `search`.
    pub fn over(pattern: &'a [WordTokens], search: &'a [WordTokens], max_offset: usize) -> Self {
        Self::new(pattern, search, max_offset, LineRange::from_len(0, search.len()))
    }

    /// The positions at which [`match_at`](Self::match_at) can place the first
    /// offset row.
    pub fn working_range(&self) -> LineRange {
        self.working_range
    }

    /// Scores the best path starting at `loc`, or `None` if `loc` is outside the
    /// working range.
    pub fn match_at(&mut self, loc: isize) -> Option<f32> {
        if !self.working_range.contains(loc) {
            return None;
        }

        match self.pos {
            Some(pos) if loc == pos + 1 => self.step_forward(),
            Some(pos) if loc == pos - 1 => self.step_backward(),
            _ => self.init(loc),
        }
        Some(self.recalculate())
    }

    /// The search line matched to each pattern line by the last scored path.
    ///
    /// Panics if nothing has been scored yet.
    pub fn path(&self) -> Vec<Option<usize>> {
        let Some(pos) = self.pos else {
            panic!("match path requested before any position was scored");
        };

        let mut path = vec![None; self.pattern.len()];
        let mut offset = self.first_node;
        let mut i = 0;
        path[0] = self.loc_in_range(pos + offset as isize);

        let mut next = self.rows[offset][0].next;
        while let Some(k) = next {
            // Pattern lines jumped over stay unmatched.
            i += pattern_distance(offset, k);
            offset = k;
            path[i] = self.loc_in_range(pos + (i + offset) as isize);
            next = self.rows[offset][i].next;
        }
        path
    }

    fn loc_in_range(&self, loc: isize) -> Option<usize> {
        self.range.contains(loc).then_some(loc as usize)
    }

    fn init(&mut self, loc: isize) {
        self.pos = Some(loc);
        for k in 0..=self.max_offset {
            self.update_row(k);
        }
    }

    fn step_forward(&mut self) {
        self.pos = self.pos.map(|p| p + 1);
        self.rows.rotate_left(1);
        self.update_row(self.max_offset);
    }

    fn step_backward(&mut self) {
        self.pos = self.pos.map(|p| p - 1);
        self.rows.rotate_right(1);
        self.update_row(0);
    }

    fn update_row(&mut self, k: usize) {
        let (pattern, search, range) = (self.pattern, self.search, self.range);
        let start = self.pos.unwrap_or_default() + k as isize;
        for (i, node) in self.rows[k].iter_mut().enumerate() {
            let line = start + i as isize;
            node.score = if range.contains(line) {
                match_lines(&pattern[i], &search[line as usize])
            } else {
                0.0
            };
        }
    }

    fn recalculate(&mut self) -> f32 {
        let len = self.pattern.len();

        for row in &mut self.rows {
            let tail = &mut row[len - 1];
            tail.sum = tail.score;
            tail.next = None;
        }

        for i in (0..len - 1).rev() {
            for j in 0..=self.max_offset {
                let mut best_sum = 0.0f32;
                let mut best_k = None;
                for k in 0..=self.max_offset {
                    let l = i + pattern_distance(j, k);
                    if l >= len {
                        continue;
                    }
                    let mut sum = self.rows[k][l].sum;
                    if k > j {
                        sum -= 0.5 * (k - j) as f32;
                    }
                    if sum > best_sum {
                        best_sum = sum;
                        best_k = Some(k);
                    }
                }

                let node = &mut self.rows[j][i];
                node.sum = best_sum + node.score;
                node.next = best_k;
            }
        }

        self.first_node = 0;
        let mut best = self.rows[0][0].sum;
        for k in 1..=self.max_offset {
            let sum = self.rows[k][0].sum;
            if sum > best {
                self.first_node = k;
                best = sum;
            }
        }

        best / len as f32
    }
}

/// Pattern lines between successive path nodes on offset rows `from` and `to`.
///
/// Moving to a higher row skips search lines and advances one pattern line.
/// Moving to a lower row skips `from - to` pattern lines.
fn pattern_distance(from: usize, to: usize) -> usize {
    if to >= from {
        1
    } else {
        1 + from - to
    }
}
