//! Parameter call-chain comparison.
//!
//! Chains are grouped by `binary:parameter`, bucketed by hop count and
//! compared pairwise with normalized edit distance after masking addresses
//! and auto-generated function names.

use super::{ComparisonModule, ModuleOutcome};
use crate::config::ParamChainConfig;
use crate::error::Result;
use crate::features::{load_json, FeatureLocation};
use crate::similarity::{levenshtein, normalized_edit_similarity};
use indexmap::IndexMap;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::LazyLock;

const MATCHING_DETAILS_LIMIT: usize = 100;
const UNKNOWN_PARAM: &str = "unknown";
const HOP: &str = " -> ";
const JUMP: &str = ">>";

static PARAM_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Param "([^"]*)"#).expect("static regex"));

/// Parameter call-chain comparison.
#[derive(Debug, Clone)]
pub struct ParamChainModule {
    config: ParamChainConfig,
}

/// Chains per `binary:parameter` key.
type ChainGroups = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize)]
struct ChainMatch {
    link1: String,
    link2: String,
    length: usize,
    normalized1: String,
    normalized2: String,
    distance: usize,
    similarity: f64,
}

#[derive(Debug, Serialize)]
struct GroupResult {
    similarity: f64,
    count1: usize,
    count2: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_comparisons: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_match: Option<ChainMatch>,
}

impl GroupResult {
    fn weight(&self) -> f64 {
        self.count1.max(self.count2) as f64
    }

    fn compared(&self) -> bool {
        self.total_comparisons.is_some()
    }
}

#[derive(Debug, Serialize)]
struct MatchingDetail {
    app_name: String,
    param_name: String,
    similarity: f64,
    best_match: Option<ChainMatch>,
}

#[derive(Debug, Serialize)]
struct ParamChainDetails {
    param_link_file1: PathBuf,
    param_link_file2: PathBuf,
    similarity: f64,
    param_similarities: IndexMap<String, GroupResult>,
    matching_details: Vec<MatchingDetail>,
    total_app_params: usize,
    common_app_params: usize,
    unique_app_params1: usize,
    unique_app_params2: usize,
}

impl ParamChainModule {
    #[must_use]
    pub fn new(config: ParamChainConfig) -> Self {
        Self { config }
    }

    fn compare_group(&self, links1: &[String], links2: &[String]) -> GroupResult {
        if links1.is_empty() || links2.is_empty() {
            return GroupResult {
                similarity: 0.0,
                count1: links1.len(),
                count2: links2.len(),
                total_comparisons: None,
                best_match: None,
            };
        }

        let by_length1 = bucket_by_length(links1);
        let by_length2 = bucket_by_length(links2);
        let cap = self.config.max_links_per_length;

        let mut matches = Vec::new();
        for (length, bucket1) in &by_length1 {
            let Some(bucket2) = by_length2.get(length) else {
                continue;
            };
            for link1 in bucket1.iter().take(cap) {
                let normalized1 = normalize_chain(link1);
                for link2 in bucket2.iter().take(cap) {
                    let normalized2 = normalize_chain(link2);
                    matches.push(ChainMatch {
                        link1: (*link1).to_string(),
                        link2: (*link2).to_string(),
                        length: *length,
                        distance: levenshtein(&normalized1, &normalized2),
                        similarity: normalized_edit_similarity(&normalized1, &normalized2),
                        normalized1: normalized1.clone(),
                        normalized2,
                    });
                }
            }
        }

        let similarity = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|m| m.similarity).sum::<f64>() / matches.len() as f64
        };
        let best_match = matches
            .iter()
            .fold(None::<&ChainMatch>, |best, m| match best {
                Some(b) if b.similarity >= m.similarity => Some(b),
                _ => Some(m),
            })
            .cloned();

        GroupResult {
            similarity,
            count1: links1.len(),
            count2: links2.len(),
            total_comparisons: Some(matches.len()),
            best_match,
        }
    }
}

impl ComparisonModule for ParamChainModule {
    fn name(&self) -> &str {
        "param_chain"
    }

    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome> {
        let file1 = fw1.path_for(&self.config.param_file1);
        let file2 = fw2.path_for(&self.config.param_file2);
        let links1: BTreeMap<String, Vec<String>> = load_json(&file1, "parameter call chains")?;
        let links2: BTreeMap<String, Vec<String>> = load_json(&file2, "parameter call chains")?;

        let groups1 = group_chains(&links1);
        let groups2 = group_chains(&links2);
        let keys: Vec<&String> = groups1
            .keys()
            .chain(groups2.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        tracing::debug!("comparing {} binary:parameter groups", keys.len());

        let empty = Vec::new();
        let results: Vec<(&String, GroupResult)> = keys
            .par_iter()
            .map(|&key| {
                let a = groups1.get(key).unwrap_or(&empty);
                let b = groups2.get(key).unwrap_or(&empty);
                (key, self.compare_group(a, b))
            })
            .collect();

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut matching_details = Vec::new();
        for (key, result) in &results {
            weighted += result.similarity * result.weight();
            total_weight += result.weight();
            if result.compared() && matching_details.len() < MATCHING_DETAILS_LIMIT {
                let (app_name, param_name) = key.split_once(':').unwrap_or((key.as_str(), ""));
                matching_details.push(MatchingDetail {
                    app_name: app_name.to_string(),
                    param_name: param_name.to_string(),
                    similarity: result.similarity,
                    best_match: result.best_match.clone(),
                });
            }
        }
        let similarity = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };

        let common = groups1.keys().filter(|k| groups2.contains_key(*k)).count();
        let details = ParamChainDetails {
            param_link_file1: file1,
            param_link_file2: file2,
            similarity,
            total_app_params: results.len(),
            common_app_params: common,
            unique_app_params1: groups1.len() - common,
            unique_app_params2: groups2.len() - common,
            param_similarities: results
                .into_iter()
                .map(|(key, result)| (key.clone(), result))
                .collect(),
            matching_details,
        };
        Ok(ModuleOutcome::new(similarity, &details))
    }
}

/// Parameter name named by a chain's `Param "<name>"` marker, lower-cased.
fn param_name(chain: &str) -> String {
    PARAM_MARKER
        .captures(chain)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| UNKNOWN_PARAM.to_string(), |m| m.as_str().to_lowercase())
}

fn group_chains(links: &BTreeMap<String, Vec<String>>) -> ChainGroups {
    let mut groups = ChainGroups::new();
    for (binary, chains) in links {
        for chain in chains {
            groups
                .entry(format!("{binary}:{}", param_name(chain)))
                .or_default()
                .push(chain.clone());
        }
    }
    groups
}

fn chain_length(chain: &str) -> usize {
    chain.matches("->").count() + chain.matches(JUMP).count()
}

fn bucket_by_length(chains: &[String]) -> BTreeMap<usize, Vec<&str>> {
    let mut buckets: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for chain in chains {
        buckets.entry(chain_length(chain)).or_default().push(chain);
    }
    buckets
}

fn blank(text: &str) -> String {
    " ".repeat(text.chars().count())
}

fn mask_segment(segment: &str) -> String {
    let segment = segment.trim();
    if segment.starts_with("0x") {
        blank(segment)
    } else if segment.contains("FUN_00") {
        segment
            .split_whitespace()
            .map(|word| {
                if word.contains("FUN_00") {
                    blank(word)
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        segment.to_string()
    }
}

/// Mask addresses and `FUN_00…` names in a call chain while keeping its shape.
///
/// Segments are delimited by `" -> "` and `">>"` and trimmed; a segment
/// starting with `0x`, or a word containing `FUN_00`, is replaced by the same
/// number of spaces. Separators are kept as written.
#[must_use]
pub fn normalize_chain(chain: &str) -> String {
    chain
        .split(HOP)
        .map(|hop| hop.split(JUMP).map(mask_segment).collect::<Vec<_>>().join(JUMP))
        .collect::<Vec<_>>()
        .join(HOP)
}
