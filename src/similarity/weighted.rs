//! Weighted mean over optional terms.

/// Accumulates `score * weight` over the terms that are present.
///
/// Absent terms contribute neither score nor weight; a term that is present
/// but scored 0 still counts its weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMean {
    weighted_sum: f64,
    total_weight: f64,
}

impl WeightedMean {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a present term.
    pub fn add(&mut self, score: f64, weight: f64) {
        self.weighted_sum += score * weight;
        self.total_weight += weight;
    }

    /// Add a term that may be absent.
    pub fn add_optional(&mut self, score: Option<f64>, weight: f64) {
        if let Some(score) = score {
            self.add(score, weight);
        }
    }

    /// Sum of the weights added so far.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// The mean, or 0 when no weight has been added.
    #[must_use]
    pub fn value(&self) -> f64 {
        if self.total_weight > 0.0 {
            self.weighted_sum / self.total_weight
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_terms_do_not_dilute() {
        let mut mean = WeightedMean::new();
        mean.add_optional(Some(1.0), 0.3);
        mean.add_optional(None, 0.7);
        assert!((mean.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_scores_keep_weight() {
        let mut mean = WeightedMean::new();
        mean.add(0.8, 0.5);
        mean.add(0.0, 0.3);
        mean.add(0.4, 0.2);
        assert!((mean.value() - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(WeightedMean::new().value(), 0.0);
    }
}
