//! Edit distance helpers.

/// Levenshtein distance in Unicode scalar values.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `1 - distance / max_len`, with two empty strings scoring 0.
#[must_use]
pub fn normalized_edit_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(levenshtein("httpd", "httpd"), 0);
        assert!((normalized_edit_similarity("httpd", "httpd") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_both_empty_scores_zero() {
        assert_eq!(normalized_edit_similarity("", ""), 0.0);
    }

    #[test]
    fn test_partial_similarity() {
        // kitten -> sitting is the textbook distance of 3
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert!((normalized_edit_similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
    }
}
