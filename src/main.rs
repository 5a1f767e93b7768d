use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use driftpatch::{
    apply_patch_dir, apply_patch_to_file, diff_dirs, diff_files, read_patch, write_patch_dir,
    ApplyOptions, DiffOptions, FuzzyLineMatcher, FuzzyOptions, HunkResult, PatchMode,
    PatchResult, DEFAULT_CONTEXT_LINES, DEFAULT_MAX_OFFSET, DEFAULT_MIN_MATCH_SCORE,
};
use env_logger::Builder;
use log::{error, info, warn, Level, LevelFilter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        // {:?} prints the whole anyhow context chain.
        eprintln!("{} {:?}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    setup_logging(args.verbose);

    match args.command {
        Command::Diff {
            original,
            modified,
            output,
            diff,
        } => run_diff(&original, &modified, output.as_deref(), &diff),
        Command::DiffDir {
            original_dir,
            modified_dir,
            patch_dir,
            diff,
        } => run_diff_dir(&original_dir, &modified_dir, &patch_dir, &diff),
        Command::Patch {
            patch_file,
            target_file,
            apply,
        } => run_patch(&patch_file, &target_file, &apply),
        Command::PatchDir {
            patch_dir,
            target_dir,
            apply,
        } => run_patch_dir(&patch_dir, &target_dir, &apply),
    }
}

fn run_diff(original: &Path, modified: &Path, output: Option<&Path>, args: &DiffArgs) -> Result<()> {
    let patch = diff_files(original, modified, &args.options()).with_context(|| {
        format!(
            "Failed to diff '{}' against '{}'",
            original.display(),
            modified.display()
        )
    })?;
    info!("{} hunk(s).", patch.hunks.len());

    let text = patch.render(args.auto_offset);
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write patch file '{}'", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn run_diff_dir(
    original_dir: &Path,
    modified_dir: &Path,
    patch_dir: &Path,
    args: &DiffArgs,
) -> Result<()> {
    for dir in [original_dir, modified_dir] {
        if !dir.is_dir() {
            return Err(anyhow!("'{}' is not a directory.", dir.display()));
        }
    }

    let patches = diff_dirs(original_dir, modified_dir, &args.options())
        .context("Failed to diff directories")?;
    let written = write_patch_dir(&patches, patch_dir, args.auto_offset)
        .with_context(|| format!("Failed to write patches to '{}'", patch_dir.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    info!("Wrote {} patch file(s).", written.len());
    Ok(())
}

fn run_patch(patch_file: &Path, target_file: &Path, args: &ApplyArgs) -> Result<()> {
    let options = args.options()?;
    let patch = read_patch(patch_file)
        .with_context(|| format!("Failed to read patch file '{}'", patch_file.display()))?;

    let target_dir = match target_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = target_file
        .file_name()
        .ok_or_else(|| anyhow!("'{}' does not name a file.", target_file.display()))?;

    let result = apply_patch_to_file(&patch, target_dir, Path::new(file_name), options)
        .with_context(|| format!("Failed to patch '{}'", target_file.display()))?;
    report(target_file, &result);

    if !result.all_applied_cleanly() {
        return Err(anyhow!(
            "{} of {} hunk(s) failed to apply.",
            result.failures().len(),
            result.results.len()
        ));
    }
    Ok(())
}

fn run_patch_dir(patch_dir: &Path, target_dir: &Path, args: &ApplyArgs) -> Result<()> {
    let options = args.options()?;
    if !target_dir.is_dir() {
        return Err(anyhow!(
            "Target directory '{}' not found or is not a directory.",
            target_dir.display()
        ));
    }

    let batch = apply_patch_dir(patch_dir, target_dir, options)
        .with_context(|| format!("Failed to read patches from '{}'", patch_dir.display()))?;

    let mut fail_count = 0;
    for (path, result) in &batch.results {
        match result {
            Ok(result) => {
                report(path, result);
                if !result.all_applied_cleanly() {
                    fail_count += 1;
                }
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                fail_count += 1;
            }
        }
    }

    info!("\n--- Summary ---");
    info!("Patched files: {}", batch.results.len() - fail_count);
    info!("Failed files:  {}", fail_count);
    if options.dry_run {
        info!("DRY RUN completed. No files were modified.");
    }

    if fail_count > 0 {
        warn!("Review the log for errors. Some files may be in a partially patched state.");
        return Err(anyhow!("Completed with {} failed file(s).", fail_count));
    }
    Ok(())
}

/// Prints one line per hunk and, in dry-run mode, the proposed diff.
fn report(path: &Path, result: &PatchResult) {
    println!("{}", path.display().to_string().bold());
    for hunk in &result.results {
        println!("  {}", colored_summary(hunk));
    }
    if let Some(diff) = &result.diff {
        println!("----- Proposed Changes for {} -----", path.display());
        print!("{}", diff);
        println!("------------------------------------");
    }
}

fn colored_summary(hunk: &HunkResult) -> String {
    let summary = hunk.summary();
    match hunk.mode {
        None => summary.red().to_string(),
        Some(_) if hunk.offset_warning => summary.yellow().to_string(),
        Some(PatchMode::Fuzzy) => summary.cyan().to_string(),
        Some(_) => summary.green().to_string(),
    }
}

fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();
}

/// Diffs files and applies the patches even after the target has drifted.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Diff files and apply the patches even after the target has drifted.",
    long_about = "Hunks are placed at their recorded position, then wherever their context appears verbatim, then wherever it matches best word by word."
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Increase logging verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff two files and print the patch.
    Diff {
        original: PathBuf,
        modified: PathBuf,
        /// Write the patch to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        diff: DiffArgs,
    },
    /// Diff every file present in both directories and write one patch per
    /// changed file.
    DiffDir {
        original_dir: PathBuf,
        modified_dir: PathBuf,
        patch_dir: PathBuf,
        #[command(flatten)]
        diff: DiffArgs,
    },
    /// Apply a patch file to a file.
    Patch {
        patch_file: PathBuf,
        target_file: PathBuf,
        #[command(flatten)]
        apply: ApplyArgs,
    },
    /// Apply every `*.patch` file in a directory to the matching file in a
    /// target directory.
    PatchDir {
        patch_dir: PathBuf,
        target_dir: PathBuf,
        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct DiffArgs {
    /// Number of unchanged lines kept around each change.
    #[arg(short = 'C', long, default_value_t = DEFAULT_CONTEXT_LINES)]
    context: usize,
    /// List all deletions of a change block before its insertions.
    #[arg(long)]
    no_collate: bool,
    /// Only pair lines that are identical.
    #[arg(long)]
    exact_lines: bool,
    /// Write `_` as the modified start of every hunk.
    #[arg(long)]
    auto_offset: bool,
}

impl DiffArgs {
    fn options(&self) -> DiffOptions {
        let builder = DiffOptions::builder()
            .context_lines(self.context)
            .collate(!self.no_collate);
        if self.exact_lines {
            builder.exact_lines_only().build()
        } else {
            builder.fuzzy(FuzzyLineMatcher::default()).build()
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Exact,
    Offset,
    Fuzzy,
}

impl From<ModeArg> for PatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Exact => PatchMode::Exact,
            ModeArg::Offset => PatchMode::Offset,
            ModeArg::Fuzzy => PatchMode::Fuzzy,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct ApplyArgs {
    /// The most permissive way a hunk may be placed.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Fuzzy)]
    mode: ModeArg,
    /// Maximum number of file lines a fuzzy match may skip.
    #[arg(long, default_value_t = DEFAULT_MAX_OFFSET)]
    max_offset: usize,
    /// Minimum fuzzy match score (0.0 to 1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_MATCH_SCORE)]
    min_score: f32,
    /// Do not score fuzzy placements lower the further they are from the
    /// expected line.
    #[arg(long)]
    no_distance_penalty: bool,
    /// Show what would be done, but don't modify files.
    #[arg(short = 'n', long)]
    dry_run: bool,
}

impl ApplyArgs {
    fn options(&self) -> Result<ApplyOptions> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(anyhow!("Minimum score must be between 0.0 and 1.0."));
        }
        let fuzzy = FuzzyOptions::builder()
            .max_match_offset(self.max_offset)
            .min_match_score(self.min_score)
            .enable_distance_penalty(!self.no_distance_penalty)
            .build();
        Ok(ApplyOptions::builder()
            .mode(self.mode.into())
            .fuzzy(fuzzy)
            .dry_run(self.dry_run)
            .build())
    }
}
