//! A fuzzy line-oriented differ and patcher.
//!
//! `driftpatch` produces patches whose hunks keep applying after the target
//! file has drifted from the version they were made against. Each hunk is
//! tried at its recorded position, then anywhere its context lines appear
//! verbatim, then wherever its context matches best word by word.
//!
//! ## Getting Started
//!
//! Diff two versions of a file, write the patch out as text, and apply it to
//! a copy that has since gained two lines at the top.
//!
//! ```rust
//! use driftpatch::{apply_to_content, ApplyOptions, DiffOptions, Differ, PatchFile, PatchMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let original = ["fn main() {", "    let x = 1;", "    println!(\"{x}\");", "}"];
//! let modified = ["fn main() {", "    let x = 2;", "    println!(\"{x}\");", "}"];
//!
//! let hunks = Differ::new(DiffOptions::default()).make_hunks(&original, &modified);
//! let patch = PatchFile::new(Some("main.rs".into()), Some("main.rs".into()), hunks);
//! let text = patch.render(true);
//!
//! let patch: PatchFile = text.parse()?;
//! let drifted = "// generated\nuse std::fmt;\nfn main() {\n    let x = 1;\n    println!(\"{x}\");\n}\n";
//! let result = apply_to_content(&patch, drifted, &ApplyOptions::default());
//!
//! assert!(result.all_applied_cleanly());
//! assert_eq!(result.results[0].mode, Some(PatchMode::Offset));
//! assert_eq!(result.results[0].offset, 2);
//! assert_eq!(
//!     result.new_content,
//!     "// generated\nuse std::fmt;\nfn main() {\n    let x = 2;\n    println!(\"{x}\");\n}\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Building blocks
//!
//! * [`TokenMapper`] interns lines and words as integer tokens.
//! * [`patience_match`] aligns lines that are unique on both sides.
//! * [`FuzzyLineMatcher`] and [`MatchMatrix`] align lines that changed slightly.
//! * [`Differ`] runs both matchers and cuts the result into [`CompiledHunk`]s.
//! * [`PatchFile`] reads and writes the patch text format.
//! * [`Patcher`] places hunks in a file with escalating [`PatchMode`]s.
//! * [`apply_patch_to_file`], [`apply_patch_dir`], [`diff_files`] and
//!   [`diff_dirs`] work on the file system.

mod differ;
mod error;
mod files;
mod fuzzy;
mod hunk;
mod matrix;
mod patch_file;
mod patcher;
mod patience;
mod range;
mod token;

pub use differ::{
    diff_from_matches, make_hunks, DiffOptions, DiffOptionsBuilder, Differ, DEFAULT_CONTEXT_LINES,
};
pub use error::{ParseError, PatchError};
pub use files::{
    apply_patch_dir, apply_patch_to_file, apply_to_content, diff_dirs, diff_files,
    ensure_path_is_safe, read_patch, write_patch_dir, ApplyOptions, ApplyOptionsBuilder,
    BatchResult, InMemoryResult, PatchResult, PATCH_EXTENSION,
};
pub use fuzzy::{
    levenshtein, match_lines, unmatched_ranges, FuzzyLineMatcher, DEFAULT_MIN_MATCH_SCORE,
};
pub use hunk::{CompiledHunk, DiffLine, Hunk, Operation};
pub use matrix::{MatchMatrix, DEFAULT_MAX_OFFSET};
pub use patch_file::PatchFile;
pub use patcher::{
    offset_warn_distance, FuzzyOptions, FuzzyOptionsBuilder, HunkResult, PatchMode, Patcher,
};
pub use patience::patience_match;
pub use range::LineRange;
pub use token::{split_words, Token, TokenMapper, WordTokens, RESERVED_TOKENS};
