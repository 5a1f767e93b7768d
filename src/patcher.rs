use crate::fuzzy::DEFAULT_MIN_MATCH_SCORE;
use crate::hunk::{CompiledHunk, DiffLine, Operation};
use crate::matrix::{MatchMatrix, DEFAULT_MAX_OFFSET};
use crate::range::LineRange;
use crate::token::{Token, TokenMapper, WordTokens};
use log::{debug, trace, warn};
use std::fmt;

/// How far the patcher may go to place a hunk.
///
/// Modes are ordered: each one also tries every cheaper mode first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatchMode {
    /// Only at the position recorded in the hunk, adjusted by the offset of
    /// the previous hunk.
    Exact,
    /// Anywhere the context lines appear verbatim.
    Offset,
    /// Wherever the context lines match best at word level.
    Fuzzy,
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchMode::Exact => "EXACT",
            PatchMode::Offset => "OFFSET",
            PatchMode::Fuzzy => "FUZZY",
        })
    }
}

/// Options for the fuzzy search stage of the patcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyOptions {
    /// Maximum number of file lines a match may skip between two context lines.
    pub max_match_offset: usize,
    /// A placement must score strictly above this (0.0 to 1.0).
    pub min_match_score: f32,
    /// If `true`, placements far from the expected location are scored lower.
    pub enable_distance_penalty: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            max_match_offset: DEFAULT_MAX_OFFSET,
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
            enable_distance_penalty: true,
        }
    }
}

impl FuzzyOptions {
    /// Creates a new builder for `FuzzyOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::FuzzyOptions;
    /// let options = FuzzyOptions::builder()
    ///     .min_match_score(0.7)
    ///     .enable_distance_penalty(false)
    ///     .build();
    ///
    /// assert_eq!(options.max_match_offset, 5);
    /// assert_eq!(options.min_match_score, 0.7);
    /// assert!(!options.enable_distance_penalty);
    /// ```
    pub fn builder() -> FuzzyOptionsBuilder {
        FuzzyOptionsBuilder::default()
    }
}

/// A builder for creating `FuzzyOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyOptionsBuilder {
    max_match_offset: Option<usize>,
    min_match_score: Option<f32>,
    enable_distance_penalty: Option<bool>,
}

impl FuzzyOptionsBuilder {
    pub fn max_match_offset(mut self, max_match_offset: usize) -> Self {
        self.max_match_offset = Some(max_match_offset);
        self
    }

    pub fn min_match_score(mut self, min_match_score: f32) -> Self {
        self.min_match_score = Some(min_match_score);
        self
    }

    pub fn enable_distance_penalty(mut self, enable: bool) -> Self {
        self.enable_distance_penalty = Some(enable);
        self
    }

    /// Builds the `FuzzyOptions`.
    pub fn build(self) -> FuzzyOptions {
        let default = FuzzyOptions::default();
        FuzzyOptions {
            max_match_offset: self.max_match_offset.unwrap_or(default.max_match_offset),
            min_match_score: self.min_match_score.unwrap_or(default.min_match_score),
            enable_distance_penalty: self
                .enable_distance_penalty
                .unwrap_or(default.enable_distance_penalty),
        }
    }
}

/// The outcome of applying one hunk.
#[derive(Debug, Clone, PartialEq)]
pub struct HunkResult {
    /// The hunk as it was given to the patcher.
    pub hunk: CompiledHunk,
    /// The mode that applied the hunk, or `None` if it failed.
    pub mode: Option<PatchMode>,
    /// The hunk as it was written into the file, positioned at its final
    /// location. Fuzzy matching may also have rewritten its lines.
    pub applied_hunk: Option<CompiledHunk>,
    /// Signed distance in lines from the expected location.
    pub offset: isize,
    /// Set when `offset` is large relative to the hunk and file size.
    pub offset_warning: bool,
    /// Match quality in `[0, 1]` for fuzzy placements.
    pub fuzzy_quality: f32,
    /// For failed hunks, the running search offset at the time of failure.
    pub search_offset: isize,
}

impl HunkResult {
    fn applied(hunk: &CompiledHunk, mode: PatchMode, applied_hunk: CompiledHunk) -> Self {
        Self {
            hunk: hunk.clone(),
            mode: Some(mode),
            applied_hunk: Some(applied_hunk),
            offset: 0,
            offset_warning: false,
            fuzzy_quality: 0.0,
            search_offset: 0,
        }
    }

    fn failed(hunk: CompiledHunk, search_offset: isize) -> Self {
        Self {
            hunk,
            mode: None,
            applied_hunk: None,
            offset: 0,
            offset_warning: false,
            fuzzy_quality: 0.0,
            search_offset,
        }
    }

    pub fn success(&self) -> bool {
        self.mode.is_some()
    }

    /// A one-line human-readable report.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::{PatchFile, PatchMode, Patcher};
    /// let patch: PatchFile = "@@ -2,2 +2,3 @@\n B\n+X\n C\n".parse().unwrap();
    /// let mut patcher = Patcher::new(patch.hunks, ["A", "B", "C", "D"]);
    /// patcher.patch(PatchMode::Exact);
    /// assert_eq!(patcher.results()[0].summary(), "EXACT: @@ -2,2 +2,3 @@");
    /// ```
    pub fn summary(&self) -> String {
        let header = self.hunk.header(false);
        match self.mode {
            None => format!("FAILURE: {header}"),
            Some(PatchMode::Exact) => format!("EXACT: {header}"),
            Some(PatchMode::Offset) => {
                let label = if self.offset_warning { "WARNING" } else { "OFFSET" };
                format!("{label}: {header} offset {} lines", self.offset)
            }
            Some(PatchMode::Fuzzy) => {
                let quality = (self.fuzzy_quality * 100.0) as i32;
                let mut summary = format!("FUZZY: {header} quality {quality}%");
                if self.offset != 0 {
                    summary.push_str(&format!(" offset {} lines", self.offset));
                }
                summary
            }
        }
    }
}

impl fmt::Display for HunkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// The offset beyond which a placement is reported with a warning.
pub fn offset_warn_distance(patch_len: usize, file_len: usize) -> usize {
    (patch_len * 10).max(file_len / 10)
}

/// Applies hunks to the lines of one file.
///
/// Each hunk is tried at its expected position, then (depending on the
/// [`PatchMode`]) anywhere its context appears verbatim, then wherever its
/// context matches best. Hunks never overwrite lines written by an earlier
/// hunk. A hunk that cannot be placed is recorded as failed and the rest are
/// still applied.
///
/// # Example
///
/// ```
/// # use driftpatch::{PatchFile, PatchMode, Patcher};
/// let patch: PatchFile = "@@ -2,2 +2,3 @@\n B\n+X\n C\n".parse().unwrap();
///
/// // An extra line at the top moves the context down by one.
/// let mut patcher = Patcher::new(patch.hunks, ["Z", "A", "B", "C", "D"]);
/// patcher.patch(PatchMode::Offset);
///
/// assert_eq!(patcher.result_lines(), ["Z", "A", "B", "X", "C", "D"]);
/// assert_eq!(patcher.results()[0].offset, 1);
/// ```
#[derive(Debug)]
pub struct Patcher {
    hunks: Vec<CompiledHunk>,
    results: Vec<HunkResult>,
    lines: Vec<String>,
    mapper: TokenMapper,
    options: FuzzyOptions,
    applied: bool,
    line_tokens: Option<Vec<Token>>,
    word_lines: Option<Vec<WordTokens>>,
    /// Keep-out range of the applied hunk that ends furthest down the file.
    last_keep_out: Option<LineRange>,
    /// Applied position minus expected position of the last applied hunk,
    /// corrected for failed hunks since.
    search_offset: isize,
}

impl Patcher {
    pub fn new<I, S>(hunks: impl IntoIterator<Item = CompiledHunk>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hunks: hunks.into_iter().collect(),
            results: Vec::new(),
            lines: lines.into_iter().map(Into::into).collect(),
            mapper: TokenMapper::new(),
            options: FuzzyOptions::default(),
            applied: false,
            line_tokens: None,
            word_lines: None,
            last_keep_out: None,
            search_offset: 0,
        }
    }

    /// Interns into `mapper` instead of a fresh one. Useful when patching many
    /// files that share most of their lines.
    pub fn with_mapper(mut self, mapper: TokenMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_options(mut self, options: FuzzyOptions) -> Self {
        self.options = options;
        self
    }

    /// Applies every hunk, in order, escalating up to `mode`.
    ///
    /// Panics if called more than once.
    pub fn patch(&mut self, mode: PatchMode) {
        assert!(!self.applied, "hunks have already been applied");
        self.applied = true;

        for hunk in std::mem::take(&mut self.hunks) {
            let result = self.apply_hunk(hunk, mode);
            self.results.push(result);
        }
    }

    /// One result per hunk, in hunk order.
    pub fn results(&self) -> &[HunkResult] {
        &self.results
    }

    /// The file content after patching.
    pub fn result_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_result_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn mapper(&self) -> &TokenMapper {
        &self.mapper
    }

    /// Gives back the mapper, to be reused for the next file.
    pub fn into_mapper(self) -> TokenMapper {
        self.mapper
    }

    fn apply_hunk(&mut self, hunk: CompiledHunk, mode: PatchMode) -> HunkResult {
        if let Some(result) = self.apply_exact(&hunk) {
            return result;
        }
        if mode >= PatchMode::Offset {
            if let Some(result) = self.apply_offset(&hunk) {
                return result;
            }
        }
        if mode >= PatchMode::Fuzzy {
            if let Some(result) = self.apply_fuzzy(&hunk) {
                return result;
            }
        }

        warn!("Failed to apply hunk {}", hunk.header(false));
        let result = HunkResult::failed(hunk, self.search_offset);
        self.search_offset -= result.hunk.length_delta();
        result
    }

    fn keep_out_ranges(&self) -> impl Iterator<Item = LineRange> + '_ {
        self.results
            .iter()
            .filter_map(|r| r.applied_hunk.as_ref())
            .map(CompiledHunk::trimmed_range2)
    }

    fn modified_range_end(&self) -> isize {
        self.last_keep_out.map_or(0, |r| r.end)
    }

    /// Whether applying `hunk` with its context at `loc` would leave every
    /// earlier hunk's output intact.
    fn can_apply_safely_at(&self, loc: isize, hunk: &CompiledHunk) -> bool {
        if loc >= self.modified_range_end() {
            return true;
        }

        let changed = hunk.trimmed_range1() - hunk.range1().start + loc;
        if changed.is_empty() {
            let at = changed.start;
            self.keep_out_ranges().all(|r| !(r.start < at && at < r.end))
        } else {
            self.keep_out_ranges().all(|r| !r.intersects(changed))
        }
    }

    fn apply_exact(&mut self, hunk: &CompiledHunk) -> Option<HunkResult> {
        let mut loc = hunk.range2().start + self.search_offset;
        let len = hunk.context_lines().len();
        if len == 0 {
            // A `-0,0` header puts a pure insertion before the first line.
            loc = loc.max(0);
        }
        if loc < 0 || loc as usize + len > self.lines.len() {
            return None;
        }

        let at = loc as usize;
        if self.lines[at..at + len] != *hunk.context_lines() {
            return None;
        }
        if !self.can_apply_safely_at(loc, hunk) {
            return None;
        }

        let applied = self.apply_exact_at(at, hunk);
        debug!("EXACT: {} at line {}", hunk.header(false), at + 1);
        Some(HunkResult::applied(hunk, PatchMode::Exact, applied))
    }

    /// Splices `hunk` into the file with its context starting at `loc`.
    ///
    /// Panics if the context does not match the file at `loc`.
    fn apply_exact_at(&mut self, loc: usize, hunk: &CompiledHunk) -> CompiledHunk {
        let len = hunk.context_lines().len();
        assert!(
            self.lines.get(loc..loc + len) == Some(hunk.context_lines()),
            "context of {} does not match the file at line {}",
            hunk.header(false),
            loc + 1
        );

        self.lines
            .splice(loc..loc + len, hunk.patched_lines().iter().cloned());
        if let Some(tokens) = self.line_tokens.as_mut() {
            let patched = self.mapper.intern_lines(hunk.patched_lines());
            tokens.splice(loc..loc + len, patched);
        }
        if let Some(words) = self.word_lines.as_mut() {
            let patched = self.mapper.tokenize_lines(hunk.patched_lines());
            words.splice(loc..loc + len, patched);
        }

        let at = loc as isize;
        let patched_delta: isize = self
            .results
            .iter()
            .filter_map(|r| r.applied_hunk.as_ref())
            .filter(|h| h.trimmed_range2().end <= at)
            .map(CompiledHunk::length_delta)
            .sum();
        let applied = hunk.moved_to(at - patched_delta, at);

        if at < self.modified_range_end() {
            // Landed above hunks applied earlier; their output moves down.
            let delta = hunk.length_delta();
            for result in &mut self.results {
                if let Some(later) = result.applied_hunk.as_mut() {
                    if later.trimmed_range2().start > at {
                        *later = later.moved_to(later.range1().start, later.range2().start + delta);
                    }
                }
            }
            if let Some(last) = self.last_keep_out.as_mut() {
                if last.start > at {
                    *last = *last + delta;
                }
            }
        } else {
            self.last_keep_out = Some(applied.trimmed_range2());
        }

        self.search_offset = applied.range2().start - hunk.range2().start;
        applied
    }

    fn apply_offset(&mut self, hunk: &CompiledHunk) -> Option<HunkResult> {
        let len = hunk.context_lines().len();
        let file_len = self.lines.len();
        if file_len == 0 || len > file_len {
            return None;
        }

        if self.line_tokens.is_none() {
            self.line_tokens = Some(self.mapper.intern_lines(&self.lines));
        }
        let context = self.mapper.intern_lines(hunk.context_lines());
        let tokens = self.line_tokens.as_deref()?;

        let loc = (hunk.range2().start + self.search_offset).clamp(0, file_len as isize - 1) as usize;
        let last_start = file_len - len;
        let fits = |s: usize| tokens[s..s + len] == context[..] && self.can_apply_safely_at(s as isize, hunk);

        let forward = (loc..=last_start).find(|&s| fits(s));
        let reverse = (0..=loc.min(last_start)).rev().find(|&s| fits(s));
        trace!("offset search from {loc}: forward {forward:?}, reverse {reverse:?}");

        let found = match (forward, reverse) {
            (Some(f), Some(r)) if f - loc < loc - r => f,
            (_, Some(r)) => r,
            (Some(f), None) => f,
            (None, None) => return None,
        };

        let applied = self.apply_exact_at(found, hunk);
        let offset = found as isize - loc as isize;
        let mut result = HunkResult::applied(hunk, PatchMode::Offset, applied);
        result.offset = offset;
        result.offset_warning = offset.unsigned_abs() > offset_warn_distance(len, file_len);

        if result.offset_warning {
            warn!("{}", result.summary());
        } else {
            debug!("{}", result.summary());
        }
        Some(result)
    }

    fn apply_fuzzy(&mut self, hunk: &CompiledHunk) -> Option<HunkResult> {
        let len = hunk.context_lines().len();
        if len == 0 {
            return None;
        }

        if self.word_lines.is_none() {
            self.word_lines = Some(self.mapper.tokenize_lines(&self.lines));
        }
        let pattern = self.mapper.tokenize_lines(hunk.context_lines());

        let file_len = self.lines.len();
        let mut loc = hunk.range2().start + self.search_offset;
        if loc + len as isize > file_len as isize {
            loc = file_len as isize - len as isize;
        }

        let ranges = LineRange::from_len(0, file_len).except(self.keep_out_ranges());
        let words = self.word_lines.as_deref()?;
        let (path, quality) = find_fuzzy_match(&pattern, words, loc, &ranges, &self.options)?;
        let at = path.iter().flatten().copied().next()?;

        let fuzzy_hunk = reanchor(hunk, &path, &self.lines);
        if !self.can_apply_safely_at(at as isize, &fuzzy_hunk) {
            debug!("Fuzzy match for {} overlaps an applied hunk", hunk.header(false));
            return None;
        }

        let applied = self.apply_exact_at(at, &fuzzy_hunk);
        let offset = at as isize - loc;
        let mut result = HunkResult::applied(hunk, PatchMode::Fuzzy, applied);
        result.offset = offset;
        result.offset_warning = offset.unsigned_abs() > offset_warn_distance(len, file_len);
        result.fuzzy_quality = quality;

        debug!("{}", result.summary());
        Some(result)
    }
}

#[derive(Debug)]
struct BestMatch {
    score: f32,
    path: Option<Vec<Option<usize>>>,
}

/// Scans match matrices outward from a starting line in one direction.
struct MatchRunner<'a> {
    loc: isize,
    step: isize,
    matrices: Vec<MatchMatrix<'a>>,
    /// `matrices[first..end]` are the ones `loc` is currently inside.
    first: usize,
    end: usize,
    penalty: f32,
    penalty_per_line: f32,
}

impl<'a> MatchRunner<'a> {
    fn new(loc: isize, step: isize, matrices: Vec<MatchMatrix<'a>>, penalty_per_line: f32) -> Self {
        Self {
            loc,
            step,
            matrices,
            first: 0,
            end: 0,
            // Stays at or below zero for the whole warn distance.
            penalty: -0.1,
            penalty_per_line,
        }
    }

    /// Scores one more line. Returns `false` once this direction cannot
    /// improve on `best`.
    fn step(&mut self, best: &mut BestMatch) -> bool {
        if self.first == self.matrices.len() {
            return false;
        }
        if best.score > 1.0 - self.penalty {
            return false;
        }

        while self.end < self.matrices.len()
            && self.matrices[self.end].working_range().contains(self.loc)
        {
            self.end += 1;
        }

        for i in self.first..self.end {
            let mm = &mut self.matrices[i];
            let Some(mut score) = mm.match_at(self.loc) else {
                self.first = i + 1;
                continue;
            };
            if self.penalty > 0.0 {
                score -= self.penalty;
            }
            if score > best.score {
                best.score = score;
                best.path = Some(mm.path());
            }
        }

        self.loc += self.step;
        self.penalty += self.penalty_per_line;
        true
    }
}

/// Finds the best placement of `pattern` within `ranges` of `words`, searching
/// outward from `loc` in both directions.
fn find_fuzzy_match(
    pattern: &[WordTokens],
    words: &[WordTokens],
    loc: isize,
    ranges: &[LineRange],
    options: &FuzzyOptions,
) -> Option<(Vec<Option<usize>>, f32)> {
    let matrix = |range: &LineRange| MatchMatrix::new(pattern, words, options.max_match_offset, *range);

    let forward: Vec<_> = ranges
        .iter()
        .map(matrix)
        .filter(|mm| !mm.working_range().is_empty())
        .skip_while(|mm| loc > mm.working_range().last())
        .collect();
    let reverse: Vec<_> = ranges
        .iter()
        .rev()
        .map(matrix)
        .filter(|mm| !mm.working_range().is_empty())
        .skip_while(|mm| loc < mm.working_range().start)
        .collect();

    let warn_dist = offset_warn_distance(pattern.len(), words.len());
    let penalty_per_line = if options.enable_distance_penalty {
        1.0 / (10 * warn_dist) as f32
    } else {
        0.0
    };

    let mut fwd = MatchRunner::new(loc, 1, forward, penalty_per_line);
    let mut rev = MatchRunner::new(loc, -1, reverse, penalty_per_line);
    let mut best = BestMatch {
        score: options.min_match_score,
        path: None,
    };
    while fwd.step(&mut best) | rev.step(&mut best) {}

    let path = best.path?;
    Some((path, best.score))
}

/// Rewrites `hunk` to fit the file lines it was fuzzily matched to.
///
/// Context lines without a match are dropped, matched ones take the file's
/// text, and file lines skipped between two matches are pulled in. Those become
/// deletions when the hunk deletes on both sides of the gap and context
/// otherwise; the start and end of a hunk count as context.
fn reanchor(hunk: &CompiledHunk, path: &[Option<usize>], lines: &[String]) -> CompiledHunk {
    let mut fuzzy = hunk.to_mutable();
    let diffs = &mut fuzzy.diffs;
    let is_delete = |d: Option<&DiffLine>| d.is_some_and(|d| d.operation == Operation::Delete);

    let mut j = 0;
    let mut previous: Option<usize> = None;
    for &matched in path {
        if let (Some(m), Some(p)) = (matched, previous) {
            if m > p + 1 {
                let surrounded = j > 0 && is_delete(diffs.get(j - 1)) && is_delete(diffs.get(j));
                let operation = if surrounded {
                    Operation::Delete
                } else {
                    Operation::Equals
                };
                for line in &lines[p + 1..m] {
                    diffs.insert(j, DiffLine::new(operation, line.clone()));
                    j += 1;
                }
            }
        }
        if matched.is_some() {
            previous = matched;
        }

        while diffs[j].operation == Operation::Insert {
            j += 1;
        }
        match matched {
            None => {
                diffs.remove(j);
            }
            Some(m) => {
                diffs[j].text = lines[m].clone();
                j += 1;
            }
        }
    }

    fuzzy.recalculate_lengths();
    fuzzy.compile()
}
