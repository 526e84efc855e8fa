//! Blended set similarity.
//!
//! Jaccard, Dice, Overlap, Cosine and F1 combined with fixed weights
//! (0.3 / 0.2 / 0.1 / 0.2 / 0.2).

use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

const JACCARD_WEIGHT: f64 = 0.3;
const DICE_WEIGHT: f64 = 0.2;
const OVERLAP_WEIGHT: f64 = 0.1;
const COSINE_WEIGHT: f64 = 0.2;
const F1_WEIGHT: f64 = 0.2;

/// The individual measures behind a blended set similarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SetSimilarityBreakdown {
    pub jaccard: f64,
    pub dice: f64,
    pub overlap: f64,
    pub cosine: f64,
    pub f1: f64,
}

impl SetSimilarityBreakdown {
    /// Compute every measure for two sets. All zero when either set is empty.
    #[must_use]
    pub fn compute<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::default();
        }

        let intersection = a.intersection(b).count() as f64;
        let union = a.union(b).count() as f64;
        let len_a = a.len() as f64;
        let len_b = b.len() as f64;

        let precision = intersection / len_a;
        let recall = intersection / len_b;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            jaccard: intersection / union,
            dice: 2.0 * intersection / (len_a + len_b),
            overlap: intersection / len_a.min(len_b),
            cosine: intersection / (len_a * len_b).sqrt(),
            f1,
        }
    }

    /// The weighted blend of the five measures.
    #[must_use]
    pub fn combined(&self) -> f64 {
        JACCARD_WEIGHT * self.jaccard
            + DICE_WEIGHT * self.dice
            + OVERLAP_WEIGHT * self.overlap
            + COSINE_WEIGHT * self.cosine
            + F1_WEIGHT * self.f1
    }
}

/// Blended similarity of two sets in `[0, 1]`.
///
/// Returns 0 if either set is empty, including when both are.
#[must_use]
pub fn set_similarity<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    SetSimilarityBreakdown::compute(a, b).combined()
}

/// Plain Jaccard index, 0 if either set is empty.
#[must_use]
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
