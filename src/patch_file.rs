use crate::error::ParseError;
use crate::hunk::{CompiledHunk, DiffLine, Operation};
use crate::range::LineRange;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@@ -(\d+),(\d+) \+([_\d]+),(\d+) @@").unwrap());

/// The hunks of one file plus the paths they were diffed from.
///
/// The text form is:
///
/// ```text
/// --- <original path>
/// +++ <modified path>
/// @@ -<start1>,<len1> +<start2 or _>,<len2> @@
///  <context line>
/// -<deleted line>
/// +<inserted line>
/// ```
///
/// Starts are 1-based in text and 0-based in memory, so a `-0,0` start is -1.
/// A `_` modified start means "the original start plus the net line change of
/// every earlier hunk".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchFile {
    pub original_path: Option<String>,
    pub modified_path: Option<String>,
    pub hunks: Vec<CompiledHunk>,
}

struct PendingHunk {
    range1: LineRange,
    range2: LineRange,
    diffs: Vec<DiffLine>,
}

impl PendingHunk {
    fn finish(self) -> CompiledHunk {
        CompiledHunk::new(self.diffs, self.range1, self.range2)
    }
}

impl PatchFile {
    pub fn new(
        original_path: Option<String>,
        modified_path: Option<String>,
        hunks: Vec<CompiledHunk>,
    ) -> Self {
        Self {
            original_path,
            modified_path,
            hunks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Parses patch text.
    ///
    /// Empty lines are ignored and a trailing `\r` is stripped from every line.
    /// With `verify_headers`, explicit modified starts must agree with the
    /// running line delta and every header length must match the hunk body.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::PatchFile;
    /// let text = "--- a.txt\n+++ a.txt\n@@ -1,2 +1,2 @@\n one\n-two\n+three\n";
    /// let patch = PatchFile::from_text(text, true).unwrap();
    /// assert_eq!(patch.original_path.as_deref(), Some("a.txt"));
    /// assert_eq!(patch.hunks[0].context_lines(), ["one", "two"]);
    /// assert_eq!(patch.hunks[0].patched_lines(), ["one", "three"]);
    /// assert_eq!(patch.render(false), text);
    /// ```
    pub fn from_text(text: &str, verify_headers: bool) -> Result<Self, ParseError> {
        let lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        Self::from_lines(lines, verify_headers)
    }

    /// Parses patch text that has already been split into lines.
    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a str>,
        verify_headers: bool,
    ) -> Result<Self, ParseError> {
        let mut patch = PatchFile::default();
        let mut current: Option<PendingHunk> = None;
        let mut delta: isize = 0;

        for (index, line) in lines.into_iter().enumerate() {
            let line_number = index + 1;
            if line.is_empty() {
                continue;
            }

            if current.is_none() && !line.starts_with('@') {
                if line_number == 1 && line.starts_with("--- ") {
                    patch.original_path = Some(line[4..].to_string());
                } else if line_number == 2 && line.starts_with("+++ ") {
                    patch.modified_path = Some(line[4..].to_string());
                } else {
                    return Err(ParseError::InvalidContextLine {
                        line: line_number,
                        text: line.to_string(),
                    });
                }
                continue;
            }

            if line.starts_with('@') {
                if let Some(done) = current.take() {
                    patch.hunks.push(done.finish());
                }
                let pending = parse_header(line, line_number, delta, verify_headers)?;
                delta += pending.range2.len() as isize - pending.range1.len() as isize;
                trace!("hunk header on line {line_number}: {line}");
                current = Some(pending);
                continue;
            }

            let operation = line
                .chars()
                .next()
                .and_then(Operation::from_prefix)
                .ok_or_else(|| ParseError::InvalidLine {
                    line: line_number,
                    text: line.to_string(),
                })?;
            if let Some(pending) = current.as_mut() {
                pending.diffs.push(DiffLine::new(operation, &line[1..]));
            }
        }

        if let Some(done) = current {
            patch.hunks.push(done.finish());
        }

        if verify_headers {
            for hunk in &patch.hunks {
                if hunk.range1().len() != hunk.context_lines().len() {
                    return Err(ParseError::ContextLengthMismatch {
                        header: hunk.header(false),
                    });
                }
                if hunk.range2().len() != hunk.patched_lines().len() {
                    return Err(ParseError::PatchedLengthMismatch {
                        header: hunk.header(false),
                    });
                }
            }
        }

        debug!("Parsed {} hunk(s).", patch.hunks.len());
        Ok(patch)
    }

    /// Renders the patch back to text.
    ///
    /// The `---`/`+++` lines are only written when both paths are known. With
    /// `auto_offset` every modified start is written as `_`.
    pub fn render(&self, auto_offset: bool) -> String {
        let mut out = String::new();
        if let (Some(original), Some(modified)) = (&self.original_path, &self.modified_path) {
            out.push_str("--- ");
            out.push_str(original);
            out.push('\n');
            out.push_str("+++ ");
            out.push_str(modified);
            out.push('\n');
        }
        for hunk in &self.hunks {
            out.push_str(&hunk.header(auto_offset));
            out.push('\n');
            for diff in hunk.diffs() {
                out.push(diff.operation.prefix());
                out.push_str(&diff.text);
                out.push('\n');
            }
        }
        out
    }
}

fn parse_header(
    line: &str,
    line_number: usize,
    delta: isize,
    verify_headers: bool,
) -> Result<PendingHunk, ParseError> {
    let invalid = || ParseError::InvalidHunkHeader {
        line: line_number,
        text: line.to_string(),
    };
    let caps = HUNK_HEADER.captures(line).ok_or_else(invalid)?;
    let number = |i: usize| caps[i].parse::<usize>().map_err(|_| invalid());

    let start1 = number(1)? as isize - 1;
    let len1 = number(2)?;
    let len2 = number(4)?;

    let expected_start2 = start1 + delta;
    let start2 = if &caps[3] == "_" {
        expected_start2
    } else {
        let start2 = number(3)? as isize - 1;
        if verify_headers && start2 != expected_start2 {
            return Err(ParseError::OffsetMismatch {
                line: line_number,
                expected: (expected_start2 + 1).max(0) as usize,
                actual: (start2 + 1).max(0) as usize,
            });
        }
        start2
    };

    Ok(PendingHunk {
        range1: LineRange::new(start1, start1 + len1 as isize),
        range2: LineRange::new(start2, start2 + len2 as isize),
        diffs: Vec::new(),
    })
}

impl FromStr for PatchFile {
    type Err = ParseError;

    /// Parses with header verification enabled.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s, true)
    }
}

impl fmt::Display for PatchFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}
