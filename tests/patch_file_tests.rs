use driftpatch::{LineRange, Operation, ParseError, PatchFile};
use indoc::indoc;

#[test]
fn test_parse_paths_and_hunks() {
    let text = indoc! {"
        --- a/notes.txt
        +++ b/notes.txt
        @@ -1,2 +1,3 @@
         a
        +b
         c
        @@ -10,2 +_,1 @@
         x
        -y
    "};
    let patch = PatchFile::from_text(text, true).unwrap();

    assert_eq!(patch.original_path.as_deref(), Some("a/notes.txt"));
    assert_eq!(patch.modified_path.as_deref(), Some("b/notes.txt"));
    assert_eq!(patch.hunks.len(), 2);

    let first = &patch.hunks[0];
    assert_eq!(first.range1(), LineRange::new(0, 2));
    assert_eq!(first.range2(), LineRange::new(0, 3));
    assert_eq!(first.context_lines(), ["a", "c"]);
    assert_eq!(first.patched_lines(), ["a", "b", "c"]);

    // `_` resolves to the original start plus the +1 of the first hunk.
    let second = &patch.hunks[1];
    assert_eq!(second.range2(), LineRange::new(10, 11));
    assert_eq!(second.header(false), "@@ -10,2 +11,1 @@");
    assert_eq!(second.diffs()[1].operation, Operation::Delete);
}

#[test]
fn test_render_round_trip() {
    let text = indoc! {"
        --- old.rs
        +++ new.rs
        @@ -3,3 +3,2 @@
         fn a() {}
        -fn b() {}
         fn c() {}
        @@ -20,1 +19,2 @@
         fn z() {}
        +fn y() {}
    "};
    let patch: PatchFile = text.parse().unwrap();
    assert_eq!(patch.render(false), text);
    assert_eq!(patch.to_string(), text);

    let auto = patch.render(true);
    assert!(auto.contains("@@ -3,3 +_,2 @@"));
    assert!(auto.contains("@@ -20,1 +_,2 @@"));
    assert_eq!(PatchFile::from_text(&auto, true).unwrap(), patch);
}

#[test]
fn test_render_without_paths() {
    let patch = PatchFile::from_text("@@ -1,1 +1,1 @@\n-a\n+b\n", true).unwrap();
    assert!(patch.original_path.is_none());
    assert_eq!(patch.render(false), "@@ -1,1 +1,1 @@\n-a\n+b\n");

    // A lone `---` line is kept but not written back.
    let patch = PatchFile::from_text("--- only\n@@ -1,1 +1,1 @@\n a\n", true).unwrap();
    assert_eq!(patch.original_path.as_deref(), Some("only"));
    assert!(patch.modified_path.is_none());
    assert_eq!(patch.render(false), "@@ -1,1 +1,1 @@\n a\n");
}

#[test]
fn test_crlf_and_blank_lines_are_ignored() {
    let patch = PatchFile::from_text("@@ -1,1 +1,1 @@\r\n-a\r\n\r\n+b\r\n", true).unwrap();
    assert_eq!(patch.hunks[0].context_lines(), ["a"]);
    assert_eq!(patch.hunks[0].patched_lines(), ["b"]);
}

#[test]
fn test_zero_start_round_trips() {
    let text = "@@ -0,0 +_,2 @@\n+x\n+y\n";
    let patch = PatchFile::from_text(text, true).unwrap();
    assert_eq!(patch.hunks[0].range1(), LineRange::new(-1, -1));
    assert_eq!(patch.hunks[0].range2(), LineRange::new(-1, 1));
    assert_eq!(patch.render(true), text);
    assert_eq!(patch.render(false), "@@ -0,0 +0,2 @@\n+x\n+y\n");
}

#[test]
fn test_empty_text_has_no_hunks() {
    let patch = PatchFile::from_text("", true).unwrap();
    assert!(patch.is_empty());
    assert_eq!(patch.render(false), "");
}

#[test]
fn test_offset_mismatch_is_rejected_when_verifying() {
    let text = "@@ -1,1 +1,2 @@\n a\n+b\n@@ -5,1 +5,1 @@\n x\n";
    assert_eq!(
        PatchFile::from_text(text, true),
        Err(ParseError::OffsetMismatch {
            line: 4,
            expected: 6,
            actual: 5,
        })
    );

    let patch = PatchFile::from_text(text, false).unwrap();
    assert_eq!(patch.hunks[1].range2().start, 4);
}

#[test]
fn test_invalid_lines() {
    assert_eq!(
        PatchFile::from_text("@@ -1,1 +1,1 @@\n*bad\n", true),
        Err(ParseError::InvalidLine {
            line: 2,
            text: "*bad".to_string(),
        })
    );
    assert_eq!(
        PatchFile::from_text("@@ -1 +1 @@\n a\n", true),
        Err(ParseError::InvalidHunkHeader {
            line: 1,
            text: "@@ -1 +1 @@".to_string(),
        })
    );
    assert_eq!(
        PatchFile::from_text("hello\n@@ -1,1 +1,1 @@\n a\n", true),
        Err(ParseError::InvalidContextLine {
            line: 1,
            text: "hello".to_string(),
        })
    );
    // `+++` is only accepted on the second line.
    assert!(matches!(
        PatchFile::from_text("+++ b\n@@ -1,1 +1,1 @@\n a\n", true),
        Err(ParseError::InvalidContextLine { line: 1, .. })
    ));
}

#[test]
fn test_length_mismatch() {
    let text = "@@ -1,3 +1,3 @@\n a\n b\n";
    assert_eq!(
        PatchFile::from_text(text, true),
        Err(ParseError::ContextLengthMismatch {
            header: "@@ -1,3 +1,3 @@".to_string(),
        })
    );

    let text = "@@ -1,2 +1,3 @@\n a\n b\n";
    assert_eq!(
        PatchFile::from_text(text, true),
        Err(ParseError::PatchedLengthMismatch {
            header: "@@ -1,2 +1,3 @@".to_string(),
        })
    );

    assert!(PatchFile::from_text(text, false).is_ok());
}

#[test]
fn test_error_messages() {
    let err = PatchFile::from_text("@@ -1,1 +1,1 @@\n?x\n", true).unwrap_err();
    assert_eq!(err.to_string(), "Invalid line (2): ?x");
}
