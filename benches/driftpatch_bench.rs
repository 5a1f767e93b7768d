use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driftpatch::{
    apply_to_content, patience_match, ApplyOptions, DiffOptions, Differ, FuzzyLineMatcher,
    PatchFile, PatchMode, TokenMapper,
};
use indoc::indoc;

fn numbered_file(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("This is line number {i}\n"))
        .collect()
}

// --- Matching Benchmarks ---

fn matching_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Matching");

    let original = numbered_file(10000);
    let mut modified = original.replace("line number 5001\n", "line number 5001 changed\n");
    modified.insert_str(0, "A new first line\n");
    let original: Vec<&str> = original.lines().collect();
    let modified: Vec<&str> = modified.lines().collect();

    let mut mapper = TokenMapper::new();
    let tokens1 = mapper.intern_lines(&original);
    let tokens2 = mapper.intern_lines(&modified);
    group.bench_function("patience_10k_lines", |b| {
        b.iter(|| patience_match(black_box(&tokens1), black_box(&tokens2)))
    });

    let pattern = mapper.tokenize_lines(&original[4990..5010]);
    let search = mapper.tokenize_lines(&modified[4900..5100]);
    let matcher = FuzzyLineMatcher::default();
    group.bench_function("fuzzy_align_20_in_200", |b| {
        b.iter(|| matcher.align(black_box(&pattern), black_box(&search)))
    });

    group.bench_function("diff_10k_lines", |b| {
        b.iter(|| Differ::new(DiffOptions::default()).make_hunks(black_box(&original), black_box(&modified)))
    });

    group.finish();
}

// --- Applying Benchmarks ---

fn applying_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Applying");

    let patch: PatchFile = indoc! {"
        @@ -5000,5 +5000,5 @@
         This is line number 4999
         This is line number 5000
        -This is line number 5001
        +THIS LINE WAS CHANGED
         This is line number 5002
         This is line number 5003
    "}
    .parse()
    .unwrap();
    let exact_options = ApplyOptions::builder().mode(PatchMode::Exact).build();
    let fuzzy_options = ApplyOptions::default();

    let large_file = numbered_file(10000);
    group.bench_function("exact_large_file", |b| {
        b.iter(|| apply_to_content(black_box(&patch), black_box(&large_file), &exact_options))
    });

    let mut shifted = large_file.clone();
    shifted.insert_str(0, &"An extra line\n".repeat(50));
    group.bench_function("offset_large_file", |b| {
        b.iter(|| apply_to_content(black_box(&patch), black_box(&shifted), &fuzzy_options))
    });

    let drifted = large_file.replace("line number 5000\n", "line number 5000 (edited)\n");
    group.bench_function("fuzzy_large_file", |b| {
        b.iter(|| apply_to_content(black_box(&patch), black_box(&drifted), &fuzzy_options))
    });

    // No placement exists, so the whole file is scanned.
    let repetitive = "println!(\"hello world\");\n".repeat(10000);
    group.bench_function("fuzzy_worst_case_no_match", |b| {
        b.iter(|| apply_to_content(black_box(&patch), black_box(&repetitive), &fuzzy_options))
    });

    group.finish();
}

criterion_group!(benches, matching_benches, applying_benches);
criterion_main!(benches);
