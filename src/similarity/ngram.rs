//! N-gram generation and dense-vector cosine similarity.

use std::collections::HashMap;

/// A contiguous run of tokens.
pub type NGram = Vec<String>;

/// All contiguous windows of length `n` over `tokens`.
///
/// Yields `max(0, len - n + 1)` n-grams; `n == 0` yields none.
#[must_use]
pub fn ngrams(tokens: &[String], n: usize) -> Vec<NGram> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(<[String]>::to_vec).collect()
}

/// Occurrence counts of every n-gram for each size in `sizes`.
///
/// Counts accumulate across sizes, so a sequence scanned for n = 2 and
/// n = 3 yields one multiset holding both.
#[must_use]
pub fn count_ngrams(tokens: &[String], sizes: &[usize]) -> HashMap<NGram, usize> {
    let mut counts = HashMap::new();
    for &n in sizes {
        for gram in ngrams(tokens, n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0 when either vector has zero norm or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
