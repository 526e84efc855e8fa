//! Per-binary string dumps, grouped by where the binary lives.

use crate::error::{FirmsimError, Result};
use crate::similarity::jaccard;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

const STRINGS_SUFFIX: &str = "_strings.txt";
const COMMON_STRINGS_SAMPLE: usize = 100;
/// Token Jaccard a pair of group names must exceed to be cross-matched.
const GROUP_NAME_SIMILARITY: f64 = 0.5;

/// Bucket a `*_strings.txt` file by its name prefix.
pub(super) fn group_for(file_name: &str) -> &'static str {
    if file_name.starts_with("bin_") {
        "bin"
    } else if file_name.starts_with("etc_") {
        if file_name.contains("events_") {
            "etc_events"
        } else if file_name.contains("scripts_") {
            "etc_scripts"
        } else if file_name.contains("services_") {
            "etc_services"
        } else if file_name.contains("ath_") {
            "etc_ath"
        } else {
            "etc_other"
        }
    } else if file_name.starts_with("lib_") {
        if file_name.contains("iptables_") {
            "lib_iptables"
        } else {
            "lib_other"
        }
    } else if file_name.starts_with("www_") || file_name.starts_with("htdocs_") {
        "web"
    } else if file_name.starts_with("usr_") {
        "usr"
    } else if file_name.starts_with("sbin_") {
        "sbin"
    } else {
        "other"
    }
}

type Groups = BTreeMap<&'static str, Vec<PathBuf>>;

fn collect_groups(folder: &Path) -> Result<Groups> {
    let entries = std::fs::read_dir(folder).map_err(|e| FirmsimError::io(folder, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(STRINGS_SUFFIX))
        })
        .collect();
    files.sort();

    let mut groups = Groups::new();
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        groups.entry(group_for(&name)).or_default().push(file);
    }
    Ok(groups)
}

fn read_strings(files: &[PathBuf], min_len: usize) -> Result<HashSet<String>> {
    let mut strings = HashSet::new();
    for file in files {
        let bytes = std::fs::read(file).map_err(|e| FirmsimError::io(file, e))?;
        strings.extend(
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && line.chars().count() >= min_len)
                .map(str::to_string),
        );
    }
    Ok(strings)
}

fn name_similarity(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> { s.to_lowercase().split('_').map(str::to_string).collect() };
    jaccard(&tokens(a), &tokens(b))
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct GroupComparison {
    group: String,
    files1_count: usize,
    files2_count: usize,
    unique_strings1: usize,
    unique_strings2: usize,
    common_strings: usize,
    similarity: f64,
    weight: f64,
    weighted_similarity: f64,
    common_strings_sample: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AllStringsComparison {
    pub similarity: f64,
    strings_folder1: PathBuf,
    strings_folder2: PathBuf,
    group_count: usize,
    group_results: IndexMap<String, GroupComparison>,
}

/// Settings for [`compare_folders`].
pub(super) struct StringGroupSettings<'a> {
    pub min_string_length: usize,
    pub group_weight: &'a dyn Fn(&str) -> f64,
}

fn compare_group(
    name: String,
    files1: &[PathBuf],
    files2: &[PathBuf],
    settings: &StringGroupSettings<'_>,
) -> Result<GroupComparison> {
    let set1 = read_strings(files1, settings.min_string_length)?;
    let set2 = read_strings(files2, settings.min_string_length)?;
    let common: Vec<&String> = set1.intersection(&set2).collect();
    // An empty union scores 0; one empty side scores 0 too
    let similarity = jaccard(&set1, &set2);
    let weight = (settings.group_weight)(&name);
    Ok(GroupComparison {
        files1_count: files1.len(),
        files2_count: files2.len(),
        unique_strings1: set1.len(),
        unique_strings2: set2.len(),
        common_strings: common.len(),
        similarity,
        weight,
        weighted_similarity: similarity * weight,
        common_strings_sample: crate::modules::sorted_sample(common, COMMON_STRINGS_SAMPLE),
        group: name,
    })
}

/// Compare two string-dump folders; `None` when either folder is missing.
pub(super) fn compare_folders(
    folder1: &Path,
    folder2: &Path,
    settings: &StringGroupSettings<'_>,
) -> Result<Option<AllStringsComparison>> {
    if !folder1.is_dir() || !folder2.is_dir() {
        tracing::debug!("string dump folder missing, skipping all-strings comparison");
        return Ok(None);
    }
    let groups1 = collect_groups(folder1)?;
    let groups2 = collect_groups(folder2)?;

    let mut results: IndexMap<String, GroupComparison> = IndexMap::new();
    for (name, files1) in &groups1 {
        if let Some(files2) = groups2.get(name) {
            let result = compare_group((*name).to_string(), files1, files2, settings)?;
            results.insert((*name).to_string(), result);
        }
    }

    // One-sided groups: match by name tokens, each firmware-2 group once
    let mut remaining2: BTreeSet<&str> = groups2
        .keys()
        .copied()
        .filter(|g| !groups1.contains_key(g))
        .collect();
    for (name1, files1) in groups1.iter().filter(|(g, _)| !groups2.contains_key(*g)) {
        let mut best: Option<(&str, GroupComparison)> = None;
        for &name2 in &remaining2 {
            if name_similarity(name1, name2) <= GROUP_NAME_SIMILARITY {
                continue;
            }
            let result = compare_group(format!("{name1}_{name2}"), files1, &groups2[name2], settings)?;
            let better = best
                .as_ref()
                .map_or(result.weighted_similarity > 0.0, |(_, b)| {
                    result.weighted_similarity > b.weighted_similarity
                });
            if better {
                best = Some((name2, result));
            }
        }
        if let Some((name2, result)) = best {
            remaining2.remove(name2);
            results.entry(result.group.clone()).or_insert(result);
        }
    }

    let (weighted, total_weight) = results
        .values()
        .fold((0.0, 0.0), |(w, t), r| (w + r.weighted_similarity, t + r.weight));
    let similarity = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    };

    Ok(Some(AllStringsComparison {
        similarity,
        strings_folder1: folder1.to_path_buf(),
        strings_folder2: folder2.to_path_buf(),
        group_count: results.len(),
        group_results: results,
    }))
}
