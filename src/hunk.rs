use crate::range::LineRange;
use std::fmt;

/// The kind of change a [`DiffLine`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// The line only exists in the original file (`-`).
    Delete,
    /// The line only exists in the modified file (`+`).
    Insert,
    /// The line is unchanged (` `).
    Equals,
}

impl Operation {
    /// The single character that prefixes a line of this kind in patch text.
    pub fn prefix(self) -> char {
        match self {
            Operation::Delete => '-',
            Operation::Insert => '+',
            Operation::Equals => ' ',
        }
    }

    /// Parses a patch-text line prefix.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            '-' => Some(Operation::Delete),
            '+' => Some(Operation::Insert),
            ' ' => Some(Operation::Equals),
            _ => None,
        }
    }
}

/// One line of a hunk together with its operation.
///
/// # Example
///
/// ```
/// # use driftpatch::{DiffLine, Operation};
/// assert_eq!(DiffLine::new(Operation::Delete, "Test").to_string(), "-Test");
/// assert_eq!(DiffLine::new(Operation::Insert, "Test").to_string(), "+Test");
/// assert_eq!(DiffLine::new(Operation::Equals, "Test").to_string(), " Test");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub operation: Operation,
    /// The line content, without the prefix.
    pub text: String,
}

impl DiffLine {
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
        }
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(Operation::Delete, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(Operation::Insert, text)
    }

    pub fn equals(text: impl Into<String>) -> Self {
        Self::new(Operation::Equals, text)
    }

    /// `true` for lines that must exist in the original file.
    pub fn is_context(&self) -> bool {
        self.operation != Operation::Insert
    }

    /// `true` for lines that exist in the modified file.
    pub fn is_patched(&self) -> bool {
        self.operation != Operation::Delete
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operation.prefix(), self.text)
    }
}

/// A hunk under construction.
///
/// `length1` counts context (`Equals` + `Delete`) lines and `length2` counts
/// patched (`Equals` + `Insert`) lines. Both must be refreshed with
/// [`recalculate_lengths`](Self::recalculate_lengths) after `diffs` is edited
/// by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub diffs: Vec<DiffLine>,
    /// Zero-based first line in the original file.
    pub start1: usize,
    /// Zero-based first line in the modified file.
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl Hunk {
    /// Creates a hunk at the top of both files with lengths computed from
    /// `diffs`.
    pub fn new(diffs: Vec<DiffLine>) -> Self {
        let mut hunk = Self {
            diffs,
            ..Self::default()
        };
        hunk.recalculate_lengths();
        hunk
    }

    pub fn range1(&self) -> LineRange {
        LineRange::from_len(self.start1, self.length1)
    }

    pub fn range2(&self) -> LineRange {
        LineRange::from_len(self.start2, self.length2)
    }

    /// [`range1`](Self::range1) without leading and trailing `Equals` lines.
    pub fn trimmed_range1(&self) -> LineRange {
        trim_range(self.range1(), &self.diffs)
    }

    /// [`range2`](Self::range2) without leading and trailing `Equals` lines.
    pub fn trimmed_range2(&self) -> LineRange {
        trim_range(self.range2(), &self.diffs)
    }

    pub fn recalculate_lengths(&mut self) {
        self.length1 = self.diffs.iter().filter(|d| d.is_context()).count();
        self.length2 = self.diffs.iter().filter(|d| d.is_patched()).count();
    }

    /// Drops leading and trailing `Equals` lines beyond `context_lines`.
    ///
    /// A hunk with no changes at all is emptied.
    pub fn trim(&mut self, context_lines: usize) {
        let changed = trim_range(LineRange::from_len(0, self.diffs.len()), &self.diffs);
        if changed.is_empty() {
            self.diffs.clear();
            self.recalculate_lengths();
            return;
        }

        let leading = (changed.start as usize).saturating_sub(context_lines);
        let trailing = (self.diffs.len() - changed.end as usize).saturating_sub(context_lines);

        self.diffs.truncate(self.diffs.len() - trailing);
        self.diffs.drain(..leading);
        self.start1 += leading;
        self.start2 += leading;
        self.recalculate_lengths();
    }

    /// Reorders each block of changes so every `Delete` precedes every
    /// `Insert`.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::{DiffLine, Hunk};
    /// let hunk = Hunk::new(vec![
    ///     DiffLine::delete("a"),
    ///     DiffLine::insert("b"),
    ///     DiffLine::delete("c"),
    ///     DiffLine::insert("d"),
    ///     DiffLine::equals("e"),
    /// ]);
    /// let lines: Vec<_> = hunk.uncollate().diffs.iter().map(|d| d.to_string()).collect();
    /// assert_eq!(lines, vec!["-a", "-c", "+b", "+d", " e"]);
    /// ```
    pub fn uncollate(&self) -> Hunk {
        let mut ordered = Vec::with_capacity(self.diffs.len());
        let mut inserts = Vec::new();

        for diff in &self.diffs {
            match diff.operation {
                Operation::Delete => ordered.push(diff.clone()),
                Operation::Insert => inserts.push(diff.clone()),
                Operation::Equals => {
                    ordered.append(&mut inserts);
                    ordered.push(diff.clone());
                }
            }
        }
        ordered.append(&mut inserts);

        Hunk {
            diffs: ordered,
            start1: self.start1,
            start2: self.start2,
            length1: self.length1,
            length2: self.length2,
        }
    }

    /// Splits the hunk wherever more than `2 * context_lines` unchanged lines
    /// separate two changes. Each piece keeps `context_lines` of context on
    /// the split side.
    pub fn split(&self, context_lines: usize) -> Vec<Hunk> {
        if self.diffs.is_empty() {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        let mut start = 0;
        let mut unchanged = 0;
        for (i, diff) in self.diffs.iter().enumerate() {
            if diff.operation == Operation::Equals {
                unchanged += 1;
                continue;
            }
            if unchanged > context_lines * 2 {
                ranges.push(start..i - unchanged + context_lines);
                start = i - context_lines;
            }
            unchanged = 0;
        }
        ranges.push(start..self.diffs.len());

        let mut hunks = Vec::with_capacity(ranges.len());
        let (mut end1, mut end2, mut end_index) = (self.start1, self.start2, 0);
        for range in ranges {
            // Everything between two pieces is unchanged, so both files skip it.
            let skip = range.start - end_index;
            let mut hunk = Hunk::new(self.diffs[range.clone()].to_vec());
            hunk.start1 = end1 + skip;
            hunk.start2 = end2 + skip;

            end1 = hunk.start1 + hunk.length1;
            end2 = hunk.start2 + hunk.length2;
            end_index = range.end;
            hunks.push(hunk);
        }
        hunks
    }

    /// Freezes the hunk.
    pub fn compile(&self) -> CompiledHunk {
        CompiledHunk::new(self.diffs.clone(), self.range1(), self.range2())
    }
}

/// An immutable hunk with its derived line projections.
///
/// This is the form hunks take once parsed or diffed. Adjustments such as
/// re-anchoring produce a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledHunk {
    diffs: Vec<DiffLine>,
    context_lines: Vec<String>,
    patched_lines: Vec<String>,
    range1: LineRange,
    range2: LineRange,
    trimmed_range1: LineRange,
    trimmed_range2: LineRange,
}

impl CompiledHunk {
    /// Builds a compiled hunk from its lines and its header ranges.
    ///
    /// The ranges are taken as given; they are not checked against `diffs`.
    pub fn new(diffs: Vec<DiffLine>, range1: LineRange, range2: LineRange) -> Self {
        let context_lines = diffs
            .iter()
            .filter(|d| d.is_context())
            .map(|d| d.text.clone())
            .collect();
        let patched_lines = diffs
            .iter()
            .filter(|d| d.is_patched())
            .map(|d| d.text.clone())
            .collect();
        let trimmed_range1 = trim_range(range1, &diffs);
        let trimmed_range2 = trim_range(range2, &diffs);

        Self {
            diffs,
            context_lines,
            patched_lines,
            range1,
            range2,
            trimmed_range1,
            trimmed_range2,
        }
    }

    pub fn diffs(&self) -> &[DiffLine] {
        &self.diffs
    }

    /// Lines that must be present in the original file (`Equals` and `Delete`).
    pub fn context_lines(&self) -> &[String] {
        &self.context_lines
    }

    /// Lines present after the hunk is applied (`Equals` and `Insert`).
    pub fn patched_lines(&self) -> &[String] {
        &self.patched_lines
    }

    pub fn range1(&self) -> LineRange {
        self.range1
    }

    pub fn range2(&self) -> LineRange {
        self.range2
    }

    pub fn trimmed_range1(&self) -> LineRange {
        self.trimmed_range1
    }

    /// The part of the modified file this hunk actually changes.
    pub fn trimmed_range2(&self) -> LineRange {
        self.trimmed_range2
    }

    /// The change in file length caused by applying this hunk.
    pub fn length_delta(&self) -> isize {
        self.range2.len() as isize - self.range1.len() as isize
    }

    /// A copy of this hunk relocated to `start1` / `start2`, all ranges moved
    /// together.
    pub fn moved_to(&self, start1: isize, start2: isize) -> CompiledHunk {
        let (d1, d2) = (start1 - self.range1.start, start2 - self.range2.start);
        CompiledHunk {
            range1: self.range1 + d1,
            range2: self.range2 + d2,
            trimmed_range1: self.trimmed_range1 + d1,
            trimmed_range2: self.trimmed_range2 + d2,
            ..self.clone()
        }
    }

    /// Formats the `@@ -a,b +c,d @@` header. With `auto_offset` the modified
    /// start is written as `_`.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::{DiffLine, Hunk};
    /// let mut hunk = Hunk::new(vec![DiffLine::equals("a"), DiffLine::insert("b")]);
    /// hunk.start1 = 9;
    /// hunk.start2 = 11;
    /// let hunk = hunk.compile();
    /// assert_eq!(hunk.header(false), "@@ -10,1 +12,2 @@");
    /// assert_eq!(hunk.header(true), "@@ -10,1 +_,2 @@");
    /// ```
    pub fn header(&self, auto_offset: bool) -> String {
        if auto_offset {
            format!(
                "@@ -{},{} +_,{} @@",
                self.range1.start + 1,
                self.range1.len(),
                self.range2.len()
            )
        } else {
            format!(
                "@@ -{},{} +{},{} @@",
                self.range1.start + 1,
                self.range1.len(),
                self.range2.start + 1,
                self.range2.len()
            )
        }
    }

    /// A mutable copy with the same lines and position.
    pub fn to_mutable(&self) -> Hunk {
        Hunk {
            diffs: self.diffs.clone(),
            start1: self.range1.start.max(0) as usize,
            start2: self.range2.start.max(0) as usize,
            length1: self.range1.len(),
            length2: self.range2.len(),
        }
    }
}

impl fmt::Display for CompiledHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header(false))?;
        for diff in &self.diffs {
            writeln!(f, "{diff}")?;
        }
        Ok(())
    }
}

/// Narrows `range` past the leading and trailing `Equals` lines of `diffs`.
/// All-context hunks yield an empty range at `range.start`.
fn trim_range(range: LineRange, diffs: &[DiffLine]) -> LineRange {
    let is_change = |d: &DiffLine| d.operation != Operation::Equals;
    let Some(first) = diffs.iter().position(is_change) else {
        return range.with_len(0);
    };
    let last = diffs.iter().rposition(is_change).unwrap_or(first);

    LineRange::new(
        range.start + first as isize,
        range.end - (diffs.len() - last - 1) as isize,
    )
}
