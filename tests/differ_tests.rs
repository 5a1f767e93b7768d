use driftpatch::{diff_from_matches, make_hunks, DiffLine, DiffOptions, Differ, Operation};

fn rendered(diffs: &[DiffLine]) -> Vec<String> {
    diffs.iter().map(|d| d.to_string()).collect()
}

#[test]
fn test_identical_input_has_no_hunks() {
    let lines = ["a", "b", "c"];
    let mut differ = Differ::new(DiffOptions::default());
    assert!(differ.make_hunks(&lines, &lines).is_empty());
    assert!(differ
        .diff(&lines, &lines)
        .iter()
        .all(|d| d.operation == Operation::Equals));
}

#[test]
fn test_insert_into_empty_file() {
    let empty: [&str; 0] = [];
    let hunks = Differ::new(DiffOptions::default()).make_hunks(&empty, &["x", "y"]);
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].header(false), "@@ -1,0 +1,2 @@");
    assert!(hunks[0].context_lines().is_empty());
    assert_eq!(hunks[0].patched_lines(), ["x", "y"]);
}

#[test]
fn test_distant_changes_are_split() {
    let original: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
    let mut modified = original.clone();
    modified[2] = "changed two".to_string();
    modified[17] = "changed seventeen".to_string();

    let hunks = Differ::new(DiffOptions::default()).make_hunks(&original, &modified);
    assert_eq!(hunks.len(), 2);
    assert_eq!(hunks[0].header(false), "@@ -1,6 +1,6 @@");
    assert_eq!(hunks[1].header(false), "@@ -15,6 +15,6 @@");
    assert_eq!(hunks[1].context_lines()[0], "line 14");
    assert_eq!(hunks[1].patched_lines()[3], "changed seventeen");
}

#[test]
fn test_context_lines_option() {
    let original: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
    let mut modified = original.clone();
    modified.insert(5, "new".to_string());

    let options = DiffOptions::builder().context_lines(1).build();
    let hunks = Differ::new(options).make_hunks(&original, &modified);
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].header(false), "@@ -5,2 +5,3 @@");
    assert_eq!(
        rendered(hunks[0].diffs()),
        vec![" line 4", "+new", " line 5"]
    );
}

#[test]
fn test_fuzzy_pairs_changed_lines() {
    let original = ["fn f() {", "    call(1, 2);", "}"];
    let modified = ["fn f() {", "    call(1, 3);", "}"];

    let mut fuzzy = Differ::new(DiffOptions::default());
    assert_eq!(
        fuzzy.match_lines(&original, &modified),
        vec![Some(0), Some(1), Some(2)]
    );

    let mut exact = Differ::new(DiffOptions::builder().exact_lines_only().build());
    assert_eq!(
        exact.match_lines(&original, &modified),
        vec![Some(0), None, Some(2)]
    );
}

#[test]
fn test_collate_keeps_paired_lines_together() {
    let original = ["start", "let b = 1;", "let c = 1;", "end"];
    let modified = ["start", "let b = 2;", "let c = 2;", "end"];

    let collated = Differ::new(DiffOptions::default()).make_hunks(&original, &modified);
    assert_eq!(
        rendered(collated[0].diffs()),
        vec![
            " start",
            "-let b = 1;",
            "+let b = 2;",
            "-let c = 1;",
            "+let c = 2;",
            " end"
        ]
    );

    let options = DiffOptions::builder().collate(false).build();
    let grouped = Differ::new(options).make_hunks(&original, &modified);
    assert_eq!(
        rendered(grouped[0].diffs()),
        vec![
            " start",
            "-let b = 1;",
            "-let c = 1;",
            "+let b = 2;",
            "+let c = 2;",
            " end"
        ]
    );
    assert_eq!(grouped[0].header(false), collated[0].header(false));
}

#[test]
fn test_diff_from_matches() {
    let diffs = diff_from_matches(&[Some(0), None, Some(2)], &["a", "b", "c"], &["a", "x", "c", "d"]);
    assert_eq!(rendered(&diffs), vec![" a", "-b", "+x", " c", "+d"]);

    let paired = diff_from_matches(&[Some(0)], &["old"], &["new"]);
    assert_eq!(rendered(&paired), vec!["-old", "+new"]);
}

#[test]
fn test_make_hunks_from_diff_lines() {
    let diffs = vec![
        DiffLine::equals("a"),
        DiffLine::equals("b"),
        DiffLine::delete("c"),
        DiffLine::equals("d"),
    ];
    let hunks = make_hunks(diffs, 1, true);
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].header(false), "@@ -2,3 +2,2 @@");

    assert!(make_hunks(vec![DiffLine::equals("a")], 3, true).is_empty());
}

#[test]
fn test_mapper_is_reused_across_diffs() {
    let mut differ = Differ::new(DiffOptions::default());
    differ.make_hunks(&["a", "b"], &["a", "c"]);
    let lines = differ.mapper().max_line_id();
    differ.make_hunks(&["a", "b"], &["a", "c"]);
    assert_eq!(differ.mapper().max_line_id(), lines);
}
