//! Confusion-matrix bookkeeping for batch predictions.

use serde::{Deserialize, Serialize};

/// Counts of predicted-versus-expected outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Record one pair.
    pub fn record(&mut self, expected_similar: bool, predicted_similar: bool) {
        match (expected_similar, predicted_similar) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_negatives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// Number of recorded pairs.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Derived rates; every ratio with a zero denominator is 0.
    #[must_use]
    pub fn metrics(&self) -> ClassificationMetrics {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let tn = self.true_negatives as f64;
        let fn_ = self.false_negatives as f64;
        ClassificationMetrics {
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            false_positive_rate: ratio(fp, fp + tn),
            false_negative_rate: ratio(fn_, fn_ + tp),
            accuracy: ratio(tp + tn, tp + fp + tn + fn_),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Classification rates derived from a [`ConfusionMatrix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub accuracy: f64,
}

impl std::fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "precision {:.4}, recall {:.4}, FPR {:.4}, FNR {:.4}, accuracy {:.4}",
            self.precision,
            self.recall,
            self.false_positive_rate,
            self.false_negative_rate,
            self.accuracy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matrix_yields_zeroes() {
        let metrics = ConfusionMatrix::default().metrics();
        assert_eq!(metrics, ClassificationMetrics::default());
    }

    #[test]
    fn test_rates() {
        let matrix = ConfusionMatrix {
            true_positives: 3,
            false_positives: 1,
            true_negatives: 4,
            false_negatives: 2,
        };
        let m = matrix.metrics();
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.6).abs() < 1e-12);
        assert!((m.false_positive_rate - 0.2).abs() < 1e-12);
        assert!((m.false_negative_rate - 0.4).abs() < 1e-12);
        assert!((m.accuracy - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_only_negatives() {
        let mut matrix = ConfusionMatrix::default();
        matrix.record(false, false);
        matrix.record(false, false);
        let m = matrix.metrics();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.false_negative_rate, 0.0);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(matrix.total(), 2);
    }
}
