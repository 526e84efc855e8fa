//! Offline evaluation of persisted comparisons.
//!
//! Recomputes metrics from stored summaries at any threshold, optionally
//! re-weighting the stored per-module similarities, without running any
//! comparison again.

use super::dataset::{Dataset, FirmwarePair};
use super::history::PriorResults;
use super::metrics::{ClassificationMetrics, ConfusionMatrix};
use indexmap::IndexMap;
use serde::Serialize;

/// One evaluated pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairEvaluation {
    pub pair: FirmwarePair,
    pub stored_similarity: f64,
    pub similarity: f64,
    pub expected_similar: bool,
    pub predicted_similar: bool,
}

/// Metrics over every evaluated pair.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub threshold: f64,
    /// Weights used to recompute totals; absent when stored totals were used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<IndexMap<String, f64>>,
    pub pairs_evaluated: usize,
    pub above_threshold: usize,
    pub below_threshold: usize,
    pub confusion: ConfusionMatrix,
    pub metrics: ClassificationMetrics,
    pub pairs: Vec<PairEvaluation>,
}

/// Evaluate stored comparisons that involve at least one dataset base.
#[must_use]
pub fn evaluate_prior(
    prior: &PriorResults,
    dataset: &Dataset,
    threshold: f64,
    weights: Option<&IndexMap<String, f64>>,
) -> EvaluationReport {
    let bases: std::collections::HashSet<&str> = dataset.base_firmwares().collect();
    let mut confusion = ConfusionMatrix::default();
    let mut pairs = Vec::new();

    for (pair, comparison) in prior.iter_sorted() {
        if !bases.contains(pair.first()) && !bases.contains(pair.second()) {
            continue;
        }
        let stored_similarity = comparison.summary.total_similarity;
        let similarity = weights.map_or(stored_similarity, |w| comparison.summary.reweighted(w));
        let expected_similar = dataset.is_expected_similar(pair);
        let predicted_similar = similarity >= threshold;
        confusion.record(expected_similar, predicted_similar);
        pairs.push(PairEvaluation {
            pair: pair.clone(),
            stored_similarity,
            similarity,
            expected_similar,
            predicted_similar,
        });
    }

    let above_threshold = pairs.iter().filter(|p| p.predicted_similar).count();
    let metrics = confusion.metrics();
    tracing::info!(
        "Evaluated {} pair(s) at threshold {threshold}: {metrics}",
        pairs.len()
    );
    EvaluationReport {
        threshold,
        weights: weights.cloned(),
        pairs_evaluated: pairs.len(),
        above_threshold,
        below_threshold: pairs.len() - above_threshold,
        confusion,
        metrics,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::history::tests::write_summary;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PriorResults, Dataset) {
        let tmp = TempDir::new().unwrap();
        write_summary(tmp.path(), "a_b", "a", "b", 0.6, 0);
        write_summary(tmp.path(), "a_c", "a", "c", 0.3, 0);
        write_summary(tmp.path(), "x_y", "x", "y", 0.9, 0);
        let prior = PriorResults::scan(tmp.path());
        let dataset = Dataset::parse("h,l,base,t\n0,L,a,b\n", 1);
        (tmp, prior, dataset)
    }

    #[test]
    fn test_threshold_moves_true_positive_to_false_negative() {
        let (_tmp, prior, dataset) = fixture();

        let low = evaluate_prior(&prior, &dataset, 0.5, None);
        assert_eq!(low.pairs_evaluated, 2);
        assert_eq!(low.confusion.true_positives, 1);
        assert_eq!(low.confusion.true_negatives, 1);

        let high = evaluate_prior(&prior, &dataset, 0.7, None);
        assert_eq!(high.confusion.true_positives, 0);
        assert_eq!(high.confusion.false_negatives, 1);
        assert_eq!(high.below_threshold, 2);
    }

    #[test]
    fn test_reweighting_uses_stored_module_scores() {
        let (_tmp, prior, dataset) = fixture();
        let weights = IndexMap::from([("binwalk".to_string(), 2.0)]);
        let report = evaluate_prior(&prior, &dataset, 0.5, Some(&weights));
        // a single module: the normalized total is unchanged
        assert!((report.pairs[0].similarity - 0.6).abs() < 1e-12);
        assert!(report.weights.is_some());
    }
}
