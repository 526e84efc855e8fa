//! Unpacking-signature sequence similarity over binwalk logs.
//!
//! The binwalk log is flattened into a token sequence; the score is the mean
//! of n-gram set Jaccard and n-gram frequency cosine. Sequences too short to
//! yield n-grams fall back to Jaccard over raw `offset:description` entries.

use super::{ComparisonModule, ModuleOutcome};
use crate::config::BinwalkConfig;
use crate::error::Result;
use crate::features::{load_json, FeatureLocation};
use crate::similarity::{cosine_similarity, count_ngrams, jaccard, NGram};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

const COMMON_NGRAM_SAMPLE: usize = 10;

/// Binwalk structure comparison.
#[derive(Debug, Clone)]
pub struct BinwalkModule {
    config: BinwalkConfig,
}

#[derive(Debug, Serialize)]
struct BinwalkDetails {
    binwalk_file1: PathBuf,
    binwalk_file2: PathBuf,
    method: &'static str,
    similarity: f64,
    vector1_length: usize,
    vector2_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    ngram: Option<NGramDetails>,
}

#[derive(Debug, Serialize)]
struct NGramDetails {
    ngram_sizes: Vec<usize>,
    set_similarity: f64,
    frequency_similarity: f64,
    ngrams1_count: usize,
    ngrams2_count: usize,
    common_ngrams_count: usize,
    common_ngrams_sample: Vec<NGram>,
}

impl BinwalkModule {
    #[must_use]
    pub fn new(config: BinwalkConfig) -> Self {
        Self { config }
    }

    fn ngram_score(&self, seq1: &[String], seq2: &[String]) -> Option<(f64, NGramDetails)> {
        let sizes = &self.config.ngram_sizes;
        let counts1 = count_ngrams(seq1, sizes);
        let counts2 = count_ngrams(seq2, sizes);
        if counts1.is_empty() || counts2.is_empty() {
            return None;
        }

        let set1: HashSet<&NGram> = counts1.keys().collect();
        let set2: HashSet<&NGram> = counts2.keys().collect();
        let set_similarity = jaccard(&set1, &set2);
        let frequency_similarity = frequency_cosine(&counts1, &counts2);

        let mut common: Vec<NGram> = set1.intersection(&set2).map(|g| (*g).clone()).collect();
        common.sort();
        let common_ngrams_count = common.len();
        common.truncate(COMMON_NGRAM_SAMPLE);

        let similarity = (set_similarity + frequency_similarity) / 2.0;
        Some((
            similarity,
            NGramDetails {
                ngram_sizes: sizes.clone(),
                set_similarity,
                frequency_similarity,
                ngrams1_count: set1.len(),
                ngrams2_count: set2.len(),
                common_ngrams_count,
                common_ngrams_sample: common,
            },
        ))
    }
}

impl ComparisonModule for BinwalkModule {
    fn name(&self) -> &str {
        "binwalk"
    }

    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome> {
        let file1 = fw1.path_for(&self.config.binwalk_file1);
        let file2 = fw2.path_for(&self.config.binwalk_file2);
        let log1: Value = load_json(&file1, "binwalk log")?;
        let log2: Value = load_json(&file2, "binwalk log")?;

        let seq1 = signature_sequence(&log1);
        let seq2 = signature_sequence(&log2);
        tracing::debug!(
            "binwalk sequences: {} and {} tokens",
            seq1.len(),
            seq2.len()
        );

        let (similarity, method, ngram) = match self.ngram_score(&seq1, &seq2) {
            Some((score, details)) => (score, "ngram", Some(details)),
            None => {
                let features1 = offset_features(&log1);
                let features2 = offset_features(&log2);
                (
                    jaccard(&features1, &features2),
                    "fallback_feature_similarity",
                    None,
                )
            }
        };

        let details = BinwalkDetails {
            binwalk_file1: file1,
            binwalk_file2: file2,
            method,
            similarity,
            vector1_length: seq1.len(),
            vector2_length: seq2.len(),
            ngram,
        };
        Ok(ModuleOutcome::new(similarity, &details))
    }
}

/// Cosine of n-gram count vectors over the union vocabulary.
fn frequency_cosine(counts1: &HashMap<NGram, usize>, counts2: &HashMap<NGram, usize>) -> f64 {
    let vocab: HashSet<&NGram> = counts1.keys().chain(counts2.keys()).collect();
    let (v1, v2): (Vec<f64>, Vec<f64>) = vocab
        .into_iter()
        .map(|gram| {
            (
                counts1.get(gram).copied().unwrap_or(0) as f64,
                counts2.get(gram).copied().unwrap_or(0) as f64,
            )
        })
        .unzip();
    cosine_similarity(&v1, &v2)
}

fn token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn split_description(description: &str, out: &mut Vec<String>) {
    out.extend(description.split(',').map(|part| part.trim().to_string()));
}

/// Flatten a binwalk log into its signature token sequence.
///
/// Uses the `VECTOR` field when present; otherwise descriptions ordered by
/// numeric offset, split on commas.
fn signature_sequence(log: &Value) -> Vec<String> {
    let mut sequence = Vec::new();

    if let Some(vector) = log.get("VECTOR").and_then(Value::as_array) {
        for entry in vector {
            match entry {
                Value::Array(items) => sequence.extend(items.iter().map(token)),
                Value::Null => {}
                scalar => sequence.push(token(scalar)),
            }
        }
        return sequence;
    }

    match log {
        Value::Object(map) => {
            let mut offsets: Vec<(u64, &Value)> = map
                .iter()
                .filter_map(|(key, info)| key.parse::<u64>().ok().map(|offset| (offset, info)))
                .collect();
            offsets.sort_by_key(|(offset, _)| *offset);
            for (_, info) in offsets {
                if let Some(description) = description_of(info) {
                    split_description(description, &mut sequence);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Some(description) = description_of(item) {
                    split_description(description, &mut sequence);
                }
            }
        }
        _ => {}
    }
    sequence
}

fn description_of(info: &Value) -> Option<&str> {
    info.get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
}

/// Raw `offset:description` entries for the fallback comparison.
fn offset_features(log: &Value) -> HashSet<String> {
    let mut features = HashSet::new();
    match log {
        Value::Object(map) => {
            for (offset, info) in map {
                if let Some(description) = description_of(info) {
                    features.insert(format!("{offset}:{description}"));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let offset = item.get("offset").map(token).filter(|o| !o.is_empty());
                if let (Some(offset), Some(description)) = (offset, description_of(item)) {
                    features.insert(format!("{offset}:{description}"));
                }
            }
        }
        _ => {}
    }
    features
}
