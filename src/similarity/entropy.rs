//! Shannon entropy over discrete observations.

use std::collections::HashMap;
use std::hash::Hash;

/// Base-2 Shannon entropy of the empirical distribution of `items`.
///
/// An empty input has entropy 0.
pub fn shannon_entropy<T, I>(items: I) -> f64
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Entropy of the characters of `text`.
#[must_use]
pub fn shannon_entropy_of_chars(text: &str) -> f64 {
    shannon_entropy(text.chars())
}
