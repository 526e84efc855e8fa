//! Benchmarks for the similarity primitives and a full comparison.
//!
//! Run with: cargo bench --bench similarity_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use firmsim::similarity::{count_ngrams, levenshtein, set_similarity, MinHasher};
use std::collections::HashSet;
use std::hint::black_box;

/// Two symbol sets of `size` entries sharing roughly `overlap_percent` of them.
fn symbol_sets(size: usize, overlap_percent: usize) -> (HashSet<String>, HashSet<String>) {
    let shared = size * overlap_percent / 100;
    let a = (0..size).map(|i| format!("sym_{i}")).collect();
    let b = (0..size)
        .map(|i| if i < shared { format!("sym_{i}") } else { format!("other_{i}") })
        .collect();
    (a, b)
}

fn signature_sequence(len: usize) -> Vec<String> {
    const SIGNATURES: [&str; 6] = ["uImage", "LZMA", "Squashfs", "JFFS2", "gzip", "CRC32"];
    (0..len).map(|i| SIGNATURES[(i * 7) % SIGNATURES.len()].to_string()).collect()
}

fn benchmark_set_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_similarity");
    for size in [100, 1_000, 10_000] {
        let (a, b) = symbol_sets(size, 70);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| set_similarity(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

fn benchmark_minhash(c: &mut Criterion) {
    let hasher = MinHasher::default();
    let mut group = c.benchmark_group("minhash");
    for size in [100, 1_000, 10_000] {
        let (a, b) = symbol_sets(size, 70);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| hasher.similarity(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

fn benchmark_ngrams(c: &mut Criterion) {
    let tokens = signature_sequence(500);
    c.bench_function("count_ngrams_2_3_4", |b| {
        b.iter(|| count_ngrams(black_box(&tokens), &[2, 3, 4]));
    });
}

fn benchmark_levenshtein(c: &mut Criterion) {
    let a = "main -> FUN_00401000 -> websGetVar -> doSystemCmd -> system";
    let b = "main -> FUN_00402000 -> websGetVar -> twsystem -> system";
    c.bench_function("levenshtein_call_chain", |bench| {
        bench.iter(|| levenshtein(black_box(a), black_box(b)));
    });
}

criterion_group!(
    benches,
    benchmark_set_similarity,
    benchmark_minhash,
    benchmark_ngrams,
    benchmark_levenshtein
);
criterion_main!(benches);
