//! MinHash sketches for approximate Jaccard similarity.
//!
//! Hash coefficients are derived from fixed seeds so two independently built
//! sketches of the same set are always identical.

use std::collections::HashSet;
use std::hash::Hash;
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

/// Default number of permutations per signature.
pub const DEFAULT_NUM_PERM: usize = 128;

/// Large prime close to 2^64
const PRIME: u64 = 0xFFFF_FFFF_FFFF_FFC5;

/// MinHash signature of one set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSignature {
    /// The minimum hash value per permutation
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Estimated Jaccard similarity: the share of agreeing slots.
    #[must_use]
    pub fn estimated_similarity(&self, other: &Self) -> f64 {
        if self.values.len() != other.values.len() || self.values.is_empty() {
            return 0.0;
        }

        let matching = self
            .values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a == b)
            .count();

        matching as f64 / self.values.len() as f64
    }
}

/// Builds signatures with a fixed family of `(a, b)` hash coefficients.
#[derive(Debug, Clone)]
pub struct MinHasher {
    hash_coeffs: Vec<(u64, u64)>,
}

impl MinHasher {
    /// Create a hasher with `num_perm` permutations.
    #[must_use]
    pub fn new(num_perm: usize) -> Self {
        let hash_coeffs = (0..num_perm as u64)
            .map(|i| {
                let a = xxh3_64_with_seed(&i.to_le_bytes(), 31337) | 1;
                let b = xxh3_64_with_seed(&i.to_le_bytes(), 7919);
                (a, b)
            })
            .collect();
        Self { hash_coeffs }
    }

    /// Number of permutations in each signature.
    #[must_use]
    pub fn num_perm(&self) -> usize {
        self.hash_coeffs.len()
    }

    /// Sketch a set of strings.
    #[must_use]
    pub fn signature<S: AsRef<str> + Eq + Hash>(&self, items: &HashSet<S>) -> MinHashSignature {
        let mut min_hashes = vec![u64::MAX; self.hash_coeffs.len()];

        for item in items {
            let shingle = xxh3_64(item.as_ref().as_bytes());
            for (slot, &(a, b)) in min_hashes.iter_mut().zip(&self.hash_coeffs) {
                // h_i(x) = (a*x + b) mod prime
                let hash = a.wrapping_mul(shingle).wrapping_add(b) % PRIME;
                if hash < *slot {
                    *slot = hash;
                }
            }
        }

        MinHashSignature { values: min_hashes }
    }

    /// Estimated Jaccard of two sets; 0 when either is empty.
    #[must_use]
    pub fn similarity<S: AsRef<str> + Eq + Hash>(&self, a: &HashSet<S>, b: &HashSet<S>) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        self.signature(a).estimated_similarity(&self.signature(b))
    }
}

impl Default for MinHasher {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_PERM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(prefix: &str, range: std::ops::Range<usize>) -> HashSet<String> {
        range.map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_identical_sets() {
        let hasher = MinHasher::default();
        let a = strings("sym_", 0..50);
        assert!((hasher.similarity(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_across_hashers() {
        let a = strings("str_", 0..20);
        let s1 = MinHasher::new(64).signature(&a);
        let s2 = MinHasher::new(64).signature(&a);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_estimate_tracks_jaccard() {
        // Jaccard = 100 / 300
        let hasher = MinHasher::new(256);
        let a = strings("s", 0..200);
        let b = strings("s", 100..300);
        let estimate = hasher.similarity(&a, &b);
        assert!((estimate - 1.0 / 3.0).abs() < 0.15, "estimate {estimate}");
    }

    #[test]
    fn test_empty_side() {
        let hasher = MinHasher::default();
        let a = strings("x", 0..5);
        assert_eq!(hasher.similarity(&a, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_mismatched_lengths() {
        let a = MinHashSignature { values: vec![1, 2] };
        let b = MinHashSignature { values: vec![1] };
        assert_eq!(a.estimated_similarity(&b), 0.0);
    }
}
