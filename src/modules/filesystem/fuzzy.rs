//! Exact and fuzzy-hash matching of the binary files under a firmware root.

use crate::config::HashAlgorithm;
use crate::modules::sample;
use fuzzyhash::FuzzyHash;
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256, Sha512};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// Bytes inspected when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 1024;
const SQUASHFS_ROOT: &str = "squashfs-root";
const MATCH_SAMPLE: usize = 20;

/// One hashed binary file.
pub(super) struct HashedFile {
    rel_path: String,
    digest: String,
    fuzzy: FuzzyHash,
    fuzzy_digest: String,
}

/// Binary files keyed by normalized relative path.
pub(super) struct HashTable {
    files: BTreeMap<String, HashedFile>,
}

impl HashTable {
    /// Hash every binary file under `root`.
    pub(super) fn build(root: &Path, algorithm: HashAlgorithm) -> Self {
        let paths: Vec<_> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();

        let hashed: Vec<(String, HashedFile)> = paths
            .par_iter()
            .filter_map(|path| hash_file(root, path, algorithm))
            .collect();

        tracing::debug!(
            "{}: {} files, {} binaries hashed",
            root.display(),
            paths.len(),
            hashed.len()
        );

        // Later entries win when two paths normalize to the same key
        Self {
            files: hashed.into_iter().collect(),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.files.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Same keys with the same content and fuzzy digests.
    fn same_as(&self, other: &Self) -> bool {
        self.files.len() == other.files.len()
            && self.files.iter().zip(&other.files).all(|((k1, f1), (k2, f2))| {
                k1 == k2 && f1.digest == f2.digest && f1.fuzzy_digest == f2.fuzzy_digest
            })
    }
}

fn is_binary(path: &Path) -> bool {
    let mut head = [0u8; BINARY_SNIFF_LEN];
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    head[..filled].iter().any(|&b| b > 127)
}

/// Relative path, trimmed to start at `squashfs-root` when it appears.
fn normalized_key(rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let start = parts.iter().position(|p| p == SQUASHFS_ROOT).unwrap_or(0);
    parts[start..].join("/")
}

fn content_digest(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
        HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(data)),
    }
}

fn hash_file(root: &Path, path: &Path, algorithm: HashAlgorithm) -> Option<(String, HashedFile)> {
    if !is_binary(path) {
        return None;
    }
    let data = match std::fs::read(path) {
        Ok(data) if !data.is_empty() => data,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {e}", path.display());
            return None;
        }
    };
    let rel = path.strip_prefix(root).unwrap_or(path);
    let fuzzy = FuzzyHash::new(data.as_slice());
    Some((
        normalized_key(rel),
        HashedFile {
            rel_path: rel.to_string_lossy().into_owned(),
            digest: content_digest(&data, algorithm),
            fuzzy_digest: fuzzy.to_string(),
            fuzzy,
        },
    ))
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct ExactMatch {
    file1: String,
    file2: String,
    hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct FuzzyMatch {
    file1: String,
    file2: String,
    similarity: u32,
    fuzzy_hash1: String,
    fuzzy_hash2: String,
}

/// Result of matching two hash tables.
#[derive(Debug, Serialize)]
pub(super) struct HashComparison {
    pub similarity: f64,
    exact_matches_count: usize,
    similar_files_count: usize,
    total_comparison: usize,
    exact_similarity: f64,
    fuzzy_similarity: f64,
    similarity_threshold: u32,
    exact_matches: Vec<ExactMatch>,
    similar_files: Vec<FuzzyMatch>,
}

/// Weights and threshold for [`compare_tables`].
#[derive(Debug, Clone, Copy)]
pub(super) struct MatchSettings {
    /// Fuzzy score a candidate must exceed
    pub threshold: u32,
    pub match_weight: f64,
    pub sim_weight: f64,
}

fn exact_matches(t1: &HashTable, t2: &HashTable) -> Vec<ExactMatch> {
    if t1.same_as(t2) {
        return t1
            .files
            .values()
            .map(|f| ExactMatch {
                file1: f.rel_path.clone(),
                file2: f.rel_path.clone(),
                hash: f.digest.clone(),
            })
            .collect();
    }
    t1.files
        .iter()
        .filter_map(|(key, f1)| {
            let f2 = t2.files.get(key)?;
            (f1.digest == f2.digest).then(|| ExactMatch {
                file1: f1.rel_path.clone(),
                file2: f2.rel_path.clone(),
                hash: f1.digest.clone(),
            })
        })
        .collect()
}

/// Best fuzzy partner per firmware-1 file, then the best firmware-1 file per
/// firmware-2 partner.
fn fuzzy_matches(
    t1: &HashTable,
    t2: &HashTable,
    matched: &BTreeSet<&str>,
    threshold: u32,
) -> Vec<FuzzyMatch> {
    let candidates: Vec<(&String, &HashedFile)> = t2
        .files
        .iter()
        .filter(|(key, _)| !matched.contains(key.as_str()))
        .collect();

    let best_for_file1: Vec<(&String, &String, u32)> = t1
        .files
        .par_iter()
        .filter(|(key, _)| !matched.contains(key.as_str()))
        .filter_map(|(key1, f1)| {
            let mut best: Option<(&String, u32)> = None;
            let mut best_score = threshold;
            for &(key2, f2) in &candidates {
                if let Some(score) = f1.fuzzy.compare_to(&f2.fuzzy).map(|v| v as u32) {
                    if score > best_score {
                        best_score = score;
                        best = Some((key2, score));
                    }
                }
            }
            best.map(|(key2, score)| (key1, key2, score))
        })
        .collect();

    // Firmware-1 keys arrive in sorted order; strict `>` keeps the first on ties
    let mut best_for_file2: HashMap<&String, (&String, u32)> = HashMap::new();
    for (key1, key2, score) in best_for_file1 {
        match best_for_file2.get(key2) {
            Some((_, existing)) if *existing >= score => {}
            _ => {
                best_for_file2.insert(key2, (key1, score));
            }
        }
    }

    let mut matches: Vec<FuzzyMatch> = best_for_file2
        .into_iter()
        .filter_map(|(key2, (key1, score))| {
            let f1 = t1.files.get(key1)?;
            let f2 = t2.files.get(key2)?;
            Some(FuzzyMatch {
                file1: key1.clone(),
                file2: key2.clone(),
                similarity: score,
                fuzzy_hash1: f1.fuzzy_digest.clone(),
                fuzzy_hash2: f2.fuzzy_digest.clone(),
            })
        })
        .collect();
    matches.sort_by(|a, b| a.file1.cmp(&b.file1));
    matches
}

/// Score two hash tables.
///
/// `identical_roots` forces 1.0 when both tables are the same and non-empty.
pub(super) fn compare_tables(
    t1: &HashTable,
    t2: &HashTable,
    settings: MatchSettings,
    identical_roots: bool,
) -> HashComparison {
    let exact = exact_matches(t1, t2);
    let similar = if t1.same_as(t2) {
        Vec::new()
    } else {
        let matched: BTreeSet<&str> = t1
            .files
            .iter()
            .filter(|(key, f1)| t2.files.get(*key).is_some_and(|f2| f2.digest == f1.digest))
            .map(|(key, _)| key.as_str())
            .collect();
        fuzzy_matches(t1, t2, &matched, settings.threshold)
    };

    let total = t1.len().max(t2.len());
    let (exact_similarity, fuzzy_similarity) = if total > 0 {
        let fuzzy_sum: u64 = similar.iter().map(|m| u64::from(m.similarity)).sum();
        (
            exact.len() as f64 / total as f64,
            fuzzy_sum as f64 / (total as f64 * 100.0),
        )
    } else {
        (0.0, 0.0)
    };

    let mut similarity =
        exact_similarity * settings.match_weight + fuzzy_similarity * settings.sim_weight;
    if identical_roots && !t1.is_empty() && t1.same_as(t2) {
        similarity = 1.0;
    }

    HashComparison {
        similarity,
        exact_matches_count: exact.len(),
        similar_files_count: similar.len(),
        total_comparison: total,
        exact_similarity,
        fuzzy_similarity,
        similarity_threshold: settings.threshold,
        exact_matches: sample(&exact, MATCH_SAMPLE),
        similar_files: sample(&similar, MATCH_SAMPLE),
    }
}
