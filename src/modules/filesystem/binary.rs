//! Binary signatures: file hashes, string inventories and binary metadata.

use super::fuzzy::{compare_tables, HashComparison, HashTable, MatchSettings};
use super::optional_list_similarity;
use super::strings::{compare_folders, AllStringsComparison, StringGroupSettings};
use crate::config::FilesystemProfileConfig;
use crate::error::Result;
use crate::features::{read_optional_line_set, FeatureLocation, FirmwareProfile};
use crate::modules::sorted_sample;
use crate::similarity::{MinHasher, WeightedMean};
use serde::Serialize;
use std::path::PathBuf;

const HASH_WEIGHT: f64 = 0.3;
const STRING_WEIGHT: f64 = 0.2;
const ALLSTRINGS_WEIGHT: f64 = 0.3;
const BIN_FILE_WEIGHT: f64 = 0.2;
const COMMON_STRINGS_SAMPLE: usize = 100;

#[derive(Debug, Serialize)]
pub(super) struct BinaryComparison {
    pub similarity: f64,
    hash: Option<HashComparison>,
    string: Option<StringComparison>,
    allstrings: Option<AllStringsComparison>,
    bin_file_similarity: Option<f64>,
}

#[derive(Debug, Serialize)]
struct StringComparison {
    similarity: f64,
    string_file1: PathBuf,
    string_file2: PathBuf,
    num_perm: usize,
    common_strings_count: usize,
    common_strings_sample: Vec<String>,
}

/// Hash tables for both sides; hashed once when the roots coincide.
fn hash_similarity(
    fw1: &FeatureLocation,
    fw2: &FeatureLocation,
    config: &FilesystemProfileConfig,
    identical_roots: bool,
) -> Option<HashComparison> {
    let settings = MatchSettings {
        threshold: config.similarity_threshold,
        match_weight: config.match_weight,
        sim_weight: config.sim_weight,
    };
    let t1 = HashTable::build(fw1.root(), config.hash_algorithm);
    if identical_roots {
        return (!t1.is_empty()).then(|| compare_tables(&t1, &t1, settings, true));
    }
    let t2 = HashTable::build(fw2.root(), config.hash_algorithm);
    if t1.is_empty() && t2.is_empty() {
        return None;
    }
    Some(compare_tables(&t1, &t2, settings, false))
}

fn string_similarity(
    fw1: &FeatureLocation,
    fw2: &FeatureLocation,
    config: &FilesystemProfileConfig,
) -> Result<Option<StringComparison>> {
    let file1 = fw1.path_for(&config.string_file1);
    let file2 = fw2.path_for(&config.string_file2);
    let (Some(strings1), Some(strings2)) =
        (read_optional_line_set(&file1)?, read_optional_line_set(&file2)?)
    else {
        tracing::debug!("string inventory missing, skipping string term");
        return Ok(None);
    };

    let hasher = MinHasher::new(config.num_perm);
    let common: Vec<&String> = strings1.intersection(&strings2).collect();
    Ok(Some(StringComparison {
        similarity: hasher.similarity(&strings1, &strings2),
        string_file1: file1,
        string_file2: file2,
        num_perm: hasher.num_perm(),
        common_strings_count: common.len(),
        common_strings_sample: sorted_sample(common, COMMON_STRINGS_SAMPLE),
    }))
}

pub(super) fn compare(
    fw1: &FeatureLocation,
    fw2: &FeatureLocation,
    p1: &FirmwareProfile,
    p2: &FirmwareProfile,
    config: &FilesystemProfileConfig,
    identical_roots: bool,
) -> Result<BinaryComparison> {
    let hash = hash_similarity(fw1, fw2, config, identical_roots);
    let string = string_similarity(fw1, fw2, config)?;

    let group_weight = |group: &str| config.group_weight(group);
    let allstrings = compare_folders(
        &fw1.path_for(&config.all_strings_dir),
        &fw2.path_for(&config.all_strings_dir),
        &StringGroupSettings {
            min_string_length: config.min_string_length,
            group_weight: &group_weight,
        },
    )?;
    let bin_file_similarity =
        optional_list_similarity(p1.bin_file_info.as_ref(), p2.bin_file_info.as_ref());

    let mut mean = WeightedMean::new();
    mean.add_optional(hash.as_ref().map(|h| h.similarity), HASH_WEIGHT);
    mean.add_optional(string.as_ref().map(|s| s.similarity), STRING_WEIGHT);
    mean.add_optional(allstrings.as_ref().map(|a| a.similarity), ALLSTRINGS_WEIGHT);
    mean.add_optional(bin_file_similarity, BIN_FILE_WEIGHT);

    Ok(BinaryComparison {
        similarity: mean.value(),
        hash,
        string,
        allstrings,
        bin_file_similarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn firmware(tmp: &TempDir, name: &str, strings: Option<&str>) -> FeatureLocation {
        let dir = tmp.path().join(name).join("output_json").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(strings) = strings {
            std::fs::write(dir.join("string_name.txt"), strings).unwrap();
        }
        FeatureLocation::resolve(tmp.path().join(name), None)
    }

    #[test]
    fn test_only_string_term_present() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", Some("alpha\nbeta\n"));
        let fw2 = firmware(&tmp, "fw2", Some("alpha\nbeta\n"));
        let profile = FirmwareProfile::default();

        let result = compare(
            &fw1,
            &fw2,
            &profile,
            &profile,
            &FilesystemProfileConfig::default(),
            false,
        )
        .unwrap();
        assert!(result.hash.is_none());
        assert!(result.allstrings.is_none());
        assert!((result.similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_present_scores_zero() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", None);
        let fw2 = firmware(&tmp, "fw2", Some("alpha\n"));
        let profile = FirmwareProfile::default();

        let result = compare(
            &fw1,
            &fw2,
            &profile,
            &profile,
            &FilesystemProfileConfig::default(),
            false,
        )
        .unwrap();
        assert!(result.string.is_none());
        assert_eq!(result.similarity, 0.0);
    }
}
