use driftpatch::{
    apply_patch_dir, apply_patch_to_file, apply_to_content, diff_dirs, diff_files,
    ensure_path_is_safe, read_patch, write_patch_dir, ApplyOptions, DiffOptions, PatchError,
    PatchFile, PatchMode,
};
use indoc::indoc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const GREETING_PATCH: &str = indoc! {"
    --- a/hello.txt
    +++ b/hello.txt
    @@ -1,2 +1,2 @@
     Hello
    -world
    +drift
"};

#[test]
fn test_apply_patch_to_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("hello.txt"), "Hello\nworld\n").unwrap();

    let patch: PatchFile = GREETING_PATCH.parse().unwrap();
    let result =
        apply_patch_to_file(&patch, dir.path(), Path::new("hello.txt"), ApplyOptions::default())
            .unwrap();

    assert!(result.all_applied_cleanly());
    assert!(result.diff.is_none());
    assert_eq!(
        fs::read_to_string(dir.path().join("hello.txt")).unwrap(),
        "Hello\ndrift\n"
    );
}

#[test]
fn test_missing_final_newline_is_preserved() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("hello.txt"), "Hello\nworld").unwrap();

    let patch: PatchFile = GREETING_PATCH.parse().unwrap();
    apply_patch_to_file(&patch, dir.path(), Path::new("hello.txt"), ApplyOptions::default())
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("hello.txt")).unwrap(),
        "Hello\ndrift"
    );
}

#[test]
fn test_dry_run_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, "Hello\nworld\n").unwrap();

    let patch: PatchFile = GREETING_PATCH.parse().unwrap();
    let options = ApplyOptions::builder().dry_run(true).build();
    let result = apply_patch_to_file(&patch, dir.path(), Path::new("hello.txt"), options).unwrap();

    assert_eq!(fs::read_to_string(&file).unwrap(), "Hello\nworld\n");
    let diff = result.diff.unwrap();
    assert!(diff.contains("-world\n"));
    assert!(diff.contains("+drift\n"));
}

#[test]
fn test_partial_application_is_written() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("list.txt"), "one\ntwo\nthree\n").unwrap();

    let patch: PatchFile = indoc! {"
        @@ -1,1 +1,2 @@
         one
        +one and a half
        @@ -3,1 +4,1 @@
        -missing line
        +replacement
    "}
    .parse()
    .unwrap();
    let options = ApplyOptions::builder().mode(PatchMode::Offset).build();
    let result = apply_patch_to_file(&patch, dir.path(), Path::new("list.txt"), options).unwrap();

    assert!(!result.all_applied_cleanly());
    assert_eq!(result.failures().len(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("list.txt")).unwrap(),
        "one\none and a half\ntwo\nthree\n"
    );
}

#[test]
fn test_missing_target_is_an_error() {
    let dir = tempdir().unwrap();
    let patch: PatchFile = GREETING_PATCH.parse().unwrap();

    let result = apply_patch_to_file(&patch, dir.path(), Path::new("nope.txt"), ApplyOptions::default());
    assert!(matches!(result, Err(PatchError::TargetNotFound(_))));
}

#[test]
fn test_directory_target_is_an_error() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let patch: PatchFile = GREETING_PATCH.parse().unwrap();

    let result = apply_patch_to_file(&patch, dir.path(), Path::new("sub"), ApplyOptions::default());
    assert!(matches!(result, Err(PatchError::TargetIsDirectory { .. })));
}

#[test]
fn test_path_traversal_is_rejected() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(dir.path().join("secret.txt"), "Hello\nworld\n").unwrap();

    let patch: PatchFile = GREETING_PATCH.parse().unwrap();
    let result = apply_patch_to_file(&patch, &root, Path::new("../secret.txt"), ApplyOptions::default());

    assert!(matches!(result, Err(PatchError::PathTraversal(_))));
    assert_eq!(
        fs::read_to_string(dir.path().join("secret.txt")).unwrap(),
        "Hello\nworld\n"
    );
}

#[test]
fn test_ensure_path_is_safe_creates_parents() {
    let dir = tempdir().unwrap();
    let resolved = ensure_path_is_safe(dir.path(), Path::new("a/b/c.txt")).unwrap();

    assert!(dir.path().join("a/b").is_dir());
    assert!(resolved.starts_with(fs::canonicalize(dir.path()).unwrap()));
    assert!(resolved.ends_with("a/b/c.txt"));
}

#[test]
fn test_apply_to_content_keeps_crlf() {
    let patch: PatchFile = "@@ -1,2 +1,2 @@\n a\n-b\n+c\n".parse().unwrap();
    let result = apply_to_content(&patch, "a\r\nb\r\n", &ApplyOptions::default());
    assert_eq!(result.new_content, "a\r\nc\r\n");
}

#[test]
fn test_diff_files_then_apply_to_drifted_copy() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original.txt");
    let modified = dir.path().join("modified.txt");
    fs::write(&original, "one\ntwo\nthree\n").unwrap();
    fs::write(&modified, "one\n2\nthree\n").unwrap();

    let patch = diff_files(&original, &modified, &DiffOptions::default()).unwrap();
    assert_eq!(patch.hunks.len(), 1);
    assert_eq!(patch.hunks[0].header(false), "@@ -1,3 +1,3 @@");
    assert_eq!(
        patch.original_path.as_deref(),
        Some(original.display().to_string().as_str())
    );

    let patch_path = dir.path().join("change.patch");
    fs::write(&patch_path, patch.render(true)).unwrap();
    let patch = read_patch(&patch_path).unwrap();

    fs::write(dir.path().join("target.txt"), "zero\none\ntwo\nthree\n").unwrap();
    let result =
        apply_patch_to_file(&patch, dir.path(), Path::new("target.txt"), ApplyOptions::default())
            .unwrap();

    assert_eq!(result.results[0].mode, Some(PatchMode::Offset));
    assert_eq!(result.results[0].offset, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("target.txt")).unwrap(),
        "zero\none\n2\nthree\n"
    );
}

#[test]
fn test_read_patch_reports_parse_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.patch");
    fs::write(&path, "@@ -1,1 +1,1 @@\n!oops\n").unwrap();

    assert!(matches!(read_patch(&path), Err(PatchError::Parse { .. })));
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

#[test]
fn test_directory_round_trip() {
    let dir = tempdir().unwrap();
    let (original, modified, patches, target) = (
        dir.path().join("original"),
        dir.path().join("modified"),
        dir.path().join("patches"),
        dir.path().join("target"),
    );

    write_tree(
        &original,
        &[
            ("a.txt", "alpha\nbeta\ngamma\n"),
            ("sub/b.txt", "one\ntwo\n"),
            ("same.txt", "unchanged\n"),
            ("only_original.txt", "gone\n"),
        ],
    );
    write_tree(
        &modified,
        &[
            ("a.txt", "alpha\nBETA\ngamma\n"),
            ("sub/b.txt", "one\ntwo\nthree\n"),
            ("same.txt", "unchanged\n"),
            ("only_modified.txt", "new\n"),
        ],
    );
    write_tree(
        &target,
        &[
            ("a.txt", "header\nalpha\nbeta\ngamma\n"),
            ("sub/b.txt", "one\ntwo\n"),
        ],
    );

    let diffs = diff_dirs(&original, &modified, &DiffOptions::default()).unwrap();
    let changed: Vec<PathBuf> = diffs.iter().map(|(path, _)| path.clone()).collect();
    assert_eq!(changed, vec![PathBuf::from("a.txt"), Path::new("sub").join("b.txt")]);

    let written = write_patch_dir(&diffs, &patches, true).unwrap();
    assert_eq!(written.len(), 2);
    assert!(patches.join("a.txt.patch").is_file());
    assert!(patches.join("sub").join("b.txt.patch").is_file());

    let batch = apply_patch_dir(&patches, &target, ApplyOptions::default()).unwrap();
    assert!(batch.all_succeeded());
    assert!(batch.all_applied_cleanly());
    assert_eq!(batch.results.len(), 2);

    assert_eq!(
        fs::read_to_string(target.join("a.txt")).unwrap(),
        "header\nalpha\nBETA\ngamma\n"
    );
    assert_eq!(
        fs::read_to_string(target.join("sub").join("b.txt")).unwrap(),
        "one\ntwo\nthree\n"
    );
}

#[test]
fn test_patch_dir_collects_hard_failures() {
    let dir = tempdir().unwrap();
    let (patches, target) = (dir.path().join("patches"), dir.path().join("target"));
    write_tree(
        &patches,
        &[
            ("bad.txt.patch", "not a patch\n"),
            ("good.txt.patch", "@@ -1,1 +1,1 @@\n-old\n+new\n"),
            ("missing.txt.patch", "@@ -1,1 +1,1 @@\n-old\n+new\n"),
            ("notes.md", "ignored\n"),
        ],
    );
    write_tree(&target, &[("good.txt", "old\n")]);

    let batch = apply_patch_dir(&patches, &target, ApplyOptions::default()).unwrap();
    assert_eq!(batch.results.len(), 3);
    assert!(!batch.all_succeeded());

    let failures = batch.hard_failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].0, &PathBuf::from("bad.txt"));
    assert!(matches!(failures[0].1, PatchError::Parse { .. }));
    assert_eq!(failures[1].0, &PathBuf::from("missing.txt"));
    assert!(matches!(failures[1].1, PatchError::TargetNotFound(_)));

    assert_eq!(fs::read_to_string(target.join("good.txt")).unwrap(), "new\n");
}
