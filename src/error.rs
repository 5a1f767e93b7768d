use std::path::PathBuf;
use thiserror::Error;

/// Represents errors that can occur while parsing patch text.
///
/// Every variant is fatal to parsing the file it was found in. Line numbers are
/// 1-based positions within the patch text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line before the first hunk header was neither the `--- ` path line
    /// (line 1) nor the `+++ ` path line (line 2).
    #[error("Invalid context line ({line}): {text}")]
    InvalidContextLine { line: usize, text: String },
    /// A line starting with `@` did not match `@@ -a,b +c,d @@`.
    #[error("Invalid hunk header ({line}): {text}")]
    InvalidHunkHeader { line: usize, text: String },
    /// A hunk body line did not start with ' ', '+' or '-'.
    #[error("Invalid line ({line}): {text}")]
    InvalidLine { line: usize, text: String },
    /// An explicit modified-file start did not agree with the running line delta
    /// of the preceding hunks.
    #[error("Applied offset mismatch on line {line}; expected: {expected}, actual: {actual}")]
    OffsetMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },
    /// The number of context lines in a hunk did not match its header.
    #[error("Context length does not match contents: {header}")]
    ContextLengthMismatch { header: String },
    /// The number of patched lines in a hunk did not match its header.
    #[error("Patched length does not match contents: {header}")]
    PatchedLengthMismatch { header: String },
}

/// Represents the "hard" errors that can occur during file-level operations.
///
/// A hunk that fails to apply is not an error; it is reported through
/// [`HunkResult`](crate::HunkResult).
#[derive(Error, Debug)]
pub enum PatchError {
    /// The patch attempted to access a path outside the target directory.
    #[error("Path '{0}' resolves outside the target directory. Aborting for security.")]
    PathTraversal(PathBuf),
    /// The file a patch targets does not exist.
    #[error("Target file not found for patching: {0}")]
    TargetNotFound(PathBuf),
    /// The user does not have permission to read or write to the specified path.
    #[error("Permission denied for path: {path:?}")]
    PermissionDenied { path: PathBuf },
    /// The target path exists but is a directory, not a file.
    #[error("Target path is a directory, not a file: {path:?}")]
    TargetIsDirectory { path: PathBuf },
    /// An I/O error occurred while reading or writing a file.
    #[error("I/O error while processing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A patch file on disk could not be parsed.
    #[error("Failed to parse patch file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}
