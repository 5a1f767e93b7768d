use crate::fuzzy::FuzzyLineMatcher;
use crate::hunk::{CompiledHunk, DiffLine, Hunk};
use crate::patience::patience_match;
use crate::token::TokenMapper;
use log::debug;

/// The default number of unchanged lines kept around each change.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Options for configuring how two files are diffed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffOptions {
    /// Number of unchanged lines kept before and after each change.
    pub context_lines: usize,
    /// If `false`, deletions and insertions within a change block are
    /// regrouped so all deletions come first.
    pub collate: bool,
    /// Fuzzy matching used to pair lines that changed slightly. `None` gives a
    /// pure patience diff.
    pub fuzzy: Option<FuzzyLineMatcher>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            collate: true,
            fuzzy: Some(FuzzyLineMatcher::default()),
        }
    }
}

impl DiffOptions {
    /// Creates a new builder for `DiffOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::DiffOptions;
    /// let options = DiffOptions::builder()
    ///     .context_lines(1)
    ///     .exact_lines_only()
    ///     .build();
    ///
    /// assert_eq!(options.context_lines, 1);
    /// assert!(options.collate);
    /// assert!(options.fuzzy.is_none());
    /// ```
    pub fn builder() -> DiffOptionsBuilder {
        DiffOptionsBuilder::default()
    }
}

/// A builder for creating `DiffOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptionsBuilder {
    context_lines: Option<usize>,
    collate: Option<bool>,
    fuzzy: Option<Option<FuzzyLineMatcher>>,
}

impl DiffOptionsBuilder {
    pub fn context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = Some(context_lines);
        self
    }

    pub fn collate(mut self, collate: bool) -> Self {
        self.collate = Some(collate);
        self
    }

    /// Uses the given fuzzy matcher to pair changed lines.
    pub fn fuzzy(mut self, matcher: FuzzyLineMatcher) -> Self {
        self.fuzzy = Some(Some(matcher));
        self
    }

    /// Only pairs lines that are identical.
    pub fn exact_lines_only(mut self) -> Self {
        self.fuzzy = Some(None);
        self
    }

    /// Builds the `DiffOptions`.
    pub fn build(self) -> DiffOptions {
        let default = DiffOptions::default();
        DiffOptions {
            context_lines: self.context_lines.unwrap_or(default.context_lines),
            collate: self.collate.unwrap_or(default.collate),
            fuzzy: self.fuzzy.unwrap_or(default.fuzzy),
        }
    }
}

/// Produces hunks describing how one sequence of lines became another.
///
/// Lines are first aligned by patience matching on whole lines, then (unless
/// disabled) the remaining gaps are aligned by fuzzy word matching.
///
/// # Example
///
/// ```
/// # use driftpatch::{DiffOptions, Differ};
/// let original = ["fn main() {", "    let x = 1;", "}"];
/// let modified = ["fn main() {", "    let x = 2;", "    run(x);", "}"];
///
/// let mut differ = Differ::new(DiffOptions::default());
/// let hunks = differ.make_hunks(&original, &modified);
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].header(false), "@@ -1,3 +1,4 @@");
/// ```
#[derive(Debug, Default)]
pub struct Differ {
    mapper: TokenMapper,
    options: DiffOptions,
}

impl Differ {
    pub fn new(options: DiffOptions) -> Self {
        Self::with_mapper(TokenMapper::new(), options)
    }

    /// Creates a differ that interns into an existing mapper.
    pub fn with_mapper(mapper: TokenMapper, options: DiffOptions) -> Self {
        Self { mapper, options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn mapper(&self) -> &TokenMapper {
        &self.mapper
    }

    pub fn into_mapper(self) -> TokenMapper {
        self.mapper
    }

    /// Aligns the two sequences; entry `i` is the modified line matched to
    /// original line `i`.
    pub fn match_lines<S: AsRef<str>>(
        &mut self,
        original: &[S],
        modified: &[S],
    ) -> Vec<Option<usize>> {
        let tokens1 = self.mapper.intern_lines(original);
        let tokens2 = self.mapper.intern_lines(modified);
        let mut matches = patience_match(&tokens1, &tokens2);

        if let Some(fuzzy) = self.options.fuzzy {
            let words1 = self.mapper.tokenize_lines(original);
            let words2 = self.mapper.tokenize_lines(modified);
            fuzzy.match_lines_by_words(&mut matches, &words1, &words2);
        }
        matches
    }

    /// The full line-by-line difference between the two sequences.
    pub fn diff<S: AsRef<str>>(&mut self, original: &[S], modified: &[S]) -> Vec<DiffLine> {
        let matches = self.match_lines(original, modified);
        diff_from_matches(&matches, original, modified)
    }

    /// The difference between the two sequences as hunks with
    /// [`context_lines`](DiffOptions::context_lines) of context.
    pub fn make_hunks<S: AsRef<str>>(
        &mut self,
        original: &[S],
        modified: &[S],
    ) -> Vec<CompiledHunk> {
        let diffs = self.diff(original, modified);
        make_hunks(diffs, self.options.context_lines, self.options.collate)
    }
}

/// Expands a match array into diff lines.
///
/// A matched pair whose texts differ becomes a deletion followed by an
/// insertion.
pub fn diff_from_matches<S: AsRef<str>>(
    matches: &[Option<usize>],
    original: &[S],
    modified: &[S],
) -> Vec<DiffLine> {
    let mut diffs = Vec::with_capacity(original.len().max(modified.len()));
    let (mut l, mut r) = (0, 0);

    for (i, m) in matches.iter().enumerate() {
        let Some(m) = *m else {
            continue;
        };
        diffs.extend(original[l..i].iter().map(|s| DiffLine::delete(s.as_ref())));
        diffs.extend(modified[r..m].iter().map(|s| DiffLine::insert(s.as_ref())));

        let (old, new) = (original[i].as_ref(), modified[m].as_ref());
        if old == new {
            diffs.push(DiffLine::equals(old));
        } else {
            diffs.push(DiffLine::delete(old));
            diffs.push(DiffLine::insert(new));
        }
        l = i + 1;
        r = m + 1;
    }

    diffs.extend(original[l..].iter().map(|s| DiffLine::delete(s.as_ref())));
    diffs.extend(modified[r..].iter().map(|s| DiffLine::insert(s.as_ref())));
    diffs
}

/// Cuts a full diff into compiled hunks.
///
/// A diff without changes yields no hunks.
pub fn make_hunks(diffs: Vec<DiffLine>, context_lines: usize, collate: bool) -> Vec<CompiledHunk> {
    let mut hunk = Hunk::new(diffs);
    hunk.trim(context_lines);
    if hunk.diffs.is_empty() {
        return Vec::new();
    }
    if !collate {
        hunk = hunk.uncollate();
    }

    let hunks: Vec<CompiledHunk> = hunk
        .split(context_lines)
        .iter()
        .map(Hunk::compile)
        .collect();
    debug!("Diff produced {} hunk(s).", hunks.len());
    hunks
}
