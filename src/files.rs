//! File and directory level diffing and patching.

use crate::differ::{DiffOptions, Differ};
use crate::error::PatchError;
use crate::hunk::CompiledHunk;
use crate::patch_file::PatchFile;
use crate::patcher::{FuzzyOptions, HunkResult, PatchMode, Patcher};
use log::{debug, info, trace, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use similar::udiff::unified_diff;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The extension of patch files written by [`write_patch_dir`].
pub const PATCH_EXTENSION: &str = "patch";

/// Options for applying a patch to a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyOptions {
    /// The most permissive mode a hunk may be applied with.
    pub mode: PatchMode,
    /// Settings for the fuzzy stage.
    pub fuzzy: FuzzyOptions,
    /// If `true`, no files are written and a unified diff of the proposed
    /// change is returned instead.
    pub dry_run: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            mode: PatchMode::Fuzzy,
            fuzzy: FuzzyOptions::default(),
            dry_run: false,
        }
    }
}

impl ApplyOptions {
    /// Creates a new builder for `ApplyOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::{ApplyOptions, PatchMode};
    /// let options = ApplyOptions::builder()
    ///     .mode(PatchMode::Offset)
    ///     .dry_run(true)
    ///     .build();
    ///
    /// assert_eq!(options.mode, PatchMode::Offset);
    /// assert!(options.dry_run);
    /// ```
    pub fn builder() -> ApplyOptionsBuilder {
        ApplyOptionsBuilder::default()
    }
}

/// A builder for creating `ApplyOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptionsBuilder {
    mode: Option<PatchMode>,
    fuzzy: Option<FuzzyOptions>,
    dry_run: Option<bool>,
}

impl ApplyOptionsBuilder {
    pub fn mode(mut self, mode: PatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn fuzzy(mut self, fuzzy: FuzzyOptions) -> Self {
        self.fuzzy = Some(fuzzy);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Builds the `ApplyOptions`.
    pub fn build(self) -> ApplyOptions {
        let default = ApplyOptions::default();
        ApplyOptions {
            mode: self.mode.unwrap_or(default.mode),
            fuzzy: self.fuzzy.unwrap_or(default.fuzzy),
            dry_run: self.dry_run.unwrap_or(default.dry_run),
        }
    }
}

/// The outcome of patching one file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult {
    /// One entry per hunk, in hunk order.
    pub results: Vec<HunkResult>,
    /// The proposed change as a unified diff, in dry-run mode only.
    pub diff: Option<String>,
}

impl PatchResult {
    pub fn all_applied_cleanly(&self) -> bool {
        self.results.iter().all(HunkResult::success)
    }

    /// The hunks that could not be placed.
    pub fn failures(&self) -> Vec<&HunkResult> {
        self.results.iter().filter(|r| !r.success()).collect()
    }
}

/// The outcome of patching a string.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryResult {
    pub new_content: String,
    pub results: Vec<HunkResult>,
}

impl InMemoryResult {
    pub fn all_applied_cleanly(&self) -> bool {
        self.results.iter().all(HunkResult::success)
    }
}

/// The result of applying a directory of patches.
#[derive(Debug)]
pub struct BatchResult {
    /// One entry per patch file: the target path relative to the target
    /// directory and the outcome.
    pub results: Vec<(PathBuf, Result<PatchResult, PatchError>)>,
}

impl BatchResult {
    /// Whether every patch was applied without a hard error.
    ///
    /// Failed hunks do not count; see [`PatchResult::all_applied_cleanly`].
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|(_, res)| res.is_ok())
    }

    pub fn hard_failures(&self) -> Vec<(&PathBuf, &PatchError)> {
        self.results
            .iter()
            .filter_map(|(path, res)| res.as_ref().err().map(|e| (path, e)))
            .collect()
    }

    /// Whether every hunk of every patch was applied.
    pub fn all_applied_cleanly(&self) -> bool {
        self.results
            .iter()
            .all(|(_, res)| res.as_ref().is_ok_and(PatchResult::all_applied_cleanly))
    }
}

/// A file split into lines, remembering how to join it back.
struct SplitText {
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl SplitText {
    fn new(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
            line_ending: if content.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: content.is_empty() || content.ends_with('\n'),
        }
    }

    fn join(&self, lines: &[String]) -> String {
        let mut out = lines.join(self.line_ending);
        if self.trailing_newline && !lines.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }
}

/// Applies `patch` to `content`.
///
/// Line endings and the presence of a final newline are preserved.
///
/// # Example
///
/// ```
/// # use driftpatch::{apply_to_content, ApplyOptions, PatchFile};
/// let patch: PatchFile = "@@ -1,2 +1,2 @@\n a\n-b\n+B\n".parse().unwrap();
/// let result = apply_to_content(&patch, "x\na\nb\n", &ApplyOptions::default());
///
/// assert!(result.all_applied_cleanly());
/// assert_eq!(result.new_content, "x\na\nB\n");
/// ```
pub fn apply_to_content(patch: &PatchFile, content: &str, options: &ApplyOptions) -> InMemoryResult {
    let text = SplitText::new(content);
    trace!("  Patching {} lines.", text.lines.len());

    let mut patcher =
        Patcher::new(patch.hunks.iter().cloned(), text.lines.iter().cloned()).with_options(options.fuzzy);
    patcher.patch(options.mode);

    let results = patcher.results().to_vec();
    InMemoryResult {
        new_content: text.join(patcher.result_lines()),
        results,
    }
}

/// Converts a `std::io::Error` into a more specific `PatchError`.
fn map_io_error(path: PathBuf, e: std::io::Error) -> PatchError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => PatchError::PermissionDenied { path },
        std::io::ErrorKind::IsADirectory => PatchError::TargetIsDirectory { path },
        _ => PatchError::Io { path, source: e },
    }
}

fn map_walk_error(root: &Path, e: walkdir::Error) -> PatchError {
    let path = e.path().unwrap_or(root).to_path_buf();
    match e.into_io_error() {
        Some(io) => map_io_error(path, io),
        None => PatchError::Io {
            path,
            source: std::io::Error::new(std::io::ErrorKind::Other, "file system loop"),
        },
    }
}

fn read_file(path: &Path) -> Result<String, PatchError> {
    fs::read_to_string(path).map_err(|e| map_io_error(path.to_path_buf(), e))
}

/// Resolves `relative_path` under `base_dir`, failing if the result lies
/// outside `base_dir`.
///
/// The parent directories of the target are created. Returns the canonical
/// path of the target.
///
/// # Example
///
/// ```no_run
/// # use driftpatch::{ensure_path_is_safe, PatchError};
/// # use std::path::Path;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let base = Path::new("project");
/// assert!(ensure_path_is_safe(base, Path::new("src/lib.rs")).is_ok());
///
/// let escaped = ensure_path_is_safe(base, Path::new("../secret.txt"));
/// assert!(matches!(escaped, Err(PatchError::PathTraversal(_))));
/// # Ok(())
/// # }
/// ```
pub fn ensure_path_is_safe(base_dir: &Path, relative_path: &Path) -> Result<PathBuf, PatchError> {
    trace!(
        "  Checking path safety for base '{}' and relative path '{}'",
        base_dir.display(),
        relative_path.display()
    );
    let base_path =
        fs::canonicalize(base_dir).map_err(|e| map_io_error(base_dir.to_path_buf(), e))?;
    let target = base_dir.join(relative_path);
    let Some(file_name) = target.file_name() else {
        return Err(PatchError::PathTraversal(relative_path.to_path_buf()));
    };
    let parent = target.parent().unwrap_or(Path::new(""));
    fs::create_dir_all(parent).map_err(|e| map_io_error(parent.to_path_buf(), e))?;
    let final_path = fs::canonicalize(parent)
        .map_err(|e| map_io_error(parent.to_path_buf(), e))?
        .join(file_name);
    if !final_path.starts_with(&base_path) {
        return Err(PatchError::PathTraversal(relative_path.to_path_buf()));
    }
    Ok(final_path)
}

/// Applies `patch` to the file at `relative_path` under `target_dir`.
///
/// Failed hunks are reported in the result, and the successfully placed ones
/// are still written. In dry-run mode nothing is written and the result
/// carries a unified diff of the change instead.
///
/// # Example
///
/// ```
/// # use driftpatch::{apply_patch_to_file, ApplyOptions, PatchFile};
/// # use std::fs;
/// # use std::path::Path;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// fs::write(dir.path().join("hello.txt"), "Hello\nworld\n")?;
///
/// let patch: PatchFile = "@@ -1,2 +1,2 @@\n Hello\n-world\n+drift\n".parse()?;
/// let result = apply_patch_to_file(&patch, dir.path(), Path::new("hello.txt"), ApplyOptions::default())?;
///
/// assert!(result.all_applied_cleanly());
/// assert_eq!(fs::read_to_string(dir.path().join("hello.txt"))?, "Hello\ndrift\n");
/// # Ok(())
/// # }
/// ```
pub fn apply_patch_to_file(
    patch: &PatchFile,
    target_dir: &Path,
    relative_path: &Path,
    options: ApplyOptions,
) -> Result<PatchResult, PatchError> {
    info!("Applying patch to: {}", relative_path.display());

    let target = ensure_path_is_safe(target_dir, relative_path)?;
    trace!("    Path is safe.");

    if target.is_dir() {
        return Err(PatchError::TargetIsDirectory { path: target });
    }
    if !target.is_file() {
        return Err(PatchError::TargetNotFound(target_dir.join(relative_path)));
    }

    let original = read_file(&target)?;
    let result = apply_to_content(patch, &original, &options);
    for hunk in &result.results {
        info!("  {}", hunk.summary());
    }

    let mut diff = None;
    if options.dry_run {
        info!("  DRY RUN: Would write changes to '{}'", relative_path.display());
        diff = Some(unified_diff(
            similar::Algorithm::default(),
            &original,
            &result.new_content,
            3,
            Some(("a", "b")),
        ));
    } else {
        fs::write(&target, &result.new_content).map_err(|e| map_io_error(target.clone(), e))?;
        if result.all_applied_cleanly() {
            info!("  Successfully wrote changes to '{}'", relative_path.display());
        } else {
            warn!("  Wrote partial changes to '{}'", relative_path.display());
        }
    }

    Ok(PatchResult {
        results: result.results,
        diff,
    })
}

/// Lists the files under `root` as sorted paths relative to `root`.
fn relative_files(root: &Path) -> Result<Vec<PathBuf>, PatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| map_walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Applies every `*.patch` file under `patch_dir` to the file at the same
/// relative path, without the extension, under `target_dir`.
///
/// Failure to walk `patch_dir` is an error; failures of single patches are
/// collected in the [`BatchResult`] and the remaining patches are still
/// applied.
pub fn apply_patch_dir(
    patch_dir: &Path,
    target_dir: &Path,
    options: ApplyOptions,
) -> Result<BatchResult, PatchError> {
    let patch_files: Vec<PathBuf> = relative_files(patch_dir)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == PATCH_EXTENSION))
        .collect();
    debug!(
        "Found {} patch file(s) under '{}'.",
        patch_files.len(),
        patch_dir.display()
    );

    let results = patch_files
        .into_iter()
        .map(|patch_path| {
            let relative = patch_path.with_extension("");
            let result = read_patch(&patch_dir.join(&patch_path))
                .and_then(|patch| apply_patch_to_file(&patch, target_dir, &relative, options));
            (relative, result)
        })
        .collect();

    Ok(BatchResult { results })
}

/// Reads and parses a patch file, verifying its headers.
pub fn read_patch(path: &Path) -> Result<PatchFile, PatchError> {
    let text = read_file(path)?;
    PatchFile::from_text(&text, true).map_err(|source| PatchError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Diffs two files. The patch records both paths as given.
pub fn diff_files(
    original: &Path,
    modified: &Path,
    options: &DiffOptions,
) -> Result<PatchFile, PatchError> {
    let original_text = read_file(original)?;
    let modified_text = read_file(modified)?;
    let hunks = diff_text(&original_text, &modified_text, options);
    Ok(PatchFile::new(
        Some(original.display().to_string()),
        Some(modified.display().to_string()),
        hunks,
    ))
}

fn diff_text(original: &str, modified: &str, options: &DiffOptions) -> Vec<CompiledHunk> {
    let original: Vec<&str> = original.lines().collect();
    let modified: Vec<&str> = modified.lines().collect();
    Differ::new(*options).make_hunks(&original, &modified)
}

/// Diffs one file present in both trees. `None` if nothing changed.
fn diff_pair(
    original_dir: &Path,
    modified_dir: &Path,
    relative: &Path,
    options: &DiffOptions,
) -> Result<Option<(PathBuf, PatchFile)>, PatchError> {
    let original = read_file(&original_dir.join(relative))?;
    let modified = read_file(&modified_dir.join(relative))?;
    if original == modified {
        trace!("  '{}' is unchanged.", relative.display());
        return Ok(None);
    }

    let hunks = diff_text(&original, &modified, options);
    if hunks.is_empty() {
        return Ok(None);
    }
    debug!("  '{}': {} hunk(s).", relative.display(), hunks.len());
    let name = relative.display().to_string();
    Ok(Some((
        relative.to_path_buf(),
        PatchFile::new(Some(name.clone()), Some(name), hunks),
    )))
}

/// Diffs every file present in both trees.
///
/// Returns one patch per changed file, keyed by its path relative to the tree
/// roots and sorted by that path. Files that exist in only one tree are
/// ignored.
pub fn diff_dirs(
    original_dir: &Path,
    modified_dir: &Path,
    options: &DiffOptions,
) -> Result<Vec<(PathBuf, PatchFile)>, PatchError> {
    let common: Vec<PathBuf> = relative_files(original_dir)?
        .into_iter()
        .filter(|relative| modified_dir.join(relative).is_file())
        .collect();
    info!(
        "Diffing {} file(s) present in both '{}' and '{}'.",
        common.len(),
        original_dir.display(),
        modified_dir.display()
    );

    #[cfg(feature = "parallel")]
    let diffs = common
        .par_iter()
        .map(|relative| diff_pair(original_dir, modified_dir, relative, options))
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(not(feature = "parallel"))]
    let diffs = common
        .iter()
        .map(|relative| diff_pair(original_dir, modified_dir, relative, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(diffs.into_iter().flatten().collect())
}

/// Writes each patch to `<patch_dir>/<relative path>.patch`.
///
/// Returns the written paths.
pub fn write_patch_dir(
    patches: &[(PathBuf, PatchFile)],
    patch_dir: &Path,
    auto_offset: bool,
) -> Result<Vec<PathBuf>, PatchError> {
    fs::create_dir_all(patch_dir).map_err(|e| map_io_error(patch_dir.to_path_buf(), e))?;

    let mut written = Vec::with_capacity(patches.len());
    for (relative, patch) in patches {
        let mut name = relative.as_os_str().to_owned();
        name.push(".");
        name.push(PATCH_EXTENSION);

        let path = ensure_path_is_safe(patch_dir, Path::new(&name))?;
        fs::write(&path, patch.render(auto_offset)).map_err(|e| map_io_error(path.clone(), e))?;
        debug!("Wrote '{}'.", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_text_preserves_line_endings() {
        let lf = SplitText::new("a\nb\n");
        assert_eq!(lf.lines, ["a", "b"]);
        assert_eq!(lf.join(&lf.lines), "a\nb\n");

        let crlf = SplitText::new("a\r\nb");
        assert_eq!(crlf.lines, ["a", "b"]);
        assert_eq!(crlf.join(&["x".to_string(), "y".to_string()]), "x\r\ny");
    }

    #[test]
    fn empty_file_gains_a_final_newline() {
        let empty = SplitText::new("");
        assert!(empty.lines.is_empty());
        assert_eq!(empty.join(&["new".to_string()]), "new\n");
        assert_eq!(empty.join(&Vec::new()), "");
    }
}
