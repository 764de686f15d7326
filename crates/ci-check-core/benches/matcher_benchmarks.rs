//! Benchmarks for line-oriented pattern matching and edit application.

use ci_check_core::{apply_edits, find_first_match, find_match_ranges};
use criterion::{Criterion, criterion_group, criterion_main};
use regex::Regex;
use std::hint::black_box;
use tower_lsp_server::ls_types::{Position, Range, TextEdit};

fn travis_config(jobs: usize) -> String {
    let mut text = String::from("language: go\n\ngo:\n  - \"1.11.x\"\n  - \"1.12.x\"\n\nmatrix:\n  include:\n");
    for i in 0..jobs {
        text.push_str(&format!("    - os: linux\n      env: JOB={i}\n      script: make test-{i}\n"));
    }
    text
}

fn bench_find_match_ranges(c: &mut Criterion) {
    let pattern = Regex::new("(^go:)|(^language: go)").unwrap();
    let small = travis_config(5);
    let large = travis_config(2_000);

    c.bench_function("find_match_ranges_small", |b| {
        b.iter(|| find_match_ranges(black_box(&small), &pattern));
    });
    c.bench_function("find_match_ranges_large", |b| {
        b.iter(|| find_match_ranges(black_box(&large), &pattern));
    });
    c.bench_function("find_first_match_large", |b| {
        b.iter(|| find_first_match(black_box(&large), &pattern));
    });
}

fn bench_apply_edits(c: &mut Criterion) {
    let large = travis_config(2_000);
    let edits = [TextEdit {
        range: Range::new(Position::new(2, 3), Position::new(2, 3)),
        new_text: "\n  - \"1.13.x\"".into(),
    }];

    c.bench_function("apply_edits_large", |b| {
        b.iter(|| apply_edits(black_box(&large), &edits));
    });
}

criterion_group!(benches, bench_find_match_ranges, bench_apply_edits);
criterion_main!(benches);
