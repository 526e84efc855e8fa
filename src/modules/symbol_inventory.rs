//! Export, import, symbol and function name inventories.

use super::{sorted_sample, ComparisonModule, ModuleOutcome};
use crate::config::SymbolInventoryConfig;
use crate::error::{FirmsimError, Result};
use crate::features::{read_lines, FeatureLocation};
use crate::similarity::{jaccard, WeightedMean};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const COMMON_ITEMS_SAMPLE: usize = 100;

/// Symbol-inventory comparison.
#[derive(Debug, Clone)]
pub struct SymbolInventoryModule {
    config: SymbolInventoryConfig,
}

#[derive(Debug, Serialize)]
struct InventoryComparison {
    file1: PathBuf,
    file2: PathBuf,
    total_items1: usize,
    total_items2: usize,
    unique_items1: usize,
    unique_items2: usize,
    common_items: usize,
    common_items_sample: Vec<String>,
    similarity: f64,
    weight: f64,
    weighted_similarity: f64,
}

#[derive(Debug, Serialize)]
struct SymbolInventoryDetails {
    folder1: PathBuf,
    folder2: PathBuf,
    /// Keyed by inventory file name; `null` when missing on either side
    inventories: IndexMap<&'static str, Option<InventoryComparison>>,
    similarity: f64,
}

impl SymbolInventoryModule {
    #[must_use]
    pub fn new(config: SymbolInventoryConfig) -> Self {
        Self { config }
    }

    fn inventories(&self) -> [(&'static str, f64); 4] {
        [
            ("exports.txt", self.config.exports_weight),
            ("imports.txt", self.config.imports_weight),
            ("symbol_name.txt", self.config.symbols_weight),
            ("func_name.txt", self.config.funcs_weight),
        ]
    }
}

fn compare_inventory(
    folder1: &Path,
    folder2: &Path,
    file_name: &str,
    weight: f64,
) -> Result<Option<InventoryComparison>> {
    let file1 = folder1.join(file_name);
    let file2 = folder2.join(file_name);
    if !file1.is_file() || !file2.is_file() {
        tracing::debug!("{file_name} not present on both sides, skipping");
        return Ok(None);
    }

    let lines1 = read_lines(&file1)?;
    let lines2 = read_lines(&file2)?;
    let set1: HashSet<String> = lines1.iter().cloned().collect();
    let set2: HashSet<String> = lines2.iter().cloned().collect();
    let common: Vec<&String> = set1.intersection(&set2).collect();
    let similarity = jaccard(&set1, &set2);

    Ok(Some(InventoryComparison {
        total_items1: lines1.len(),
        total_items2: lines2.len(),
        unique_items1: set1.len(),
        unique_items2: set2.len(),
        common_items: common.len(),
        common_items_sample: sorted_sample(common, COMMON_ITEMS_SAMPLE),
        similarity,
        weight,
        weighted_similarity: similarity * weight,
        file1,
        file2,
    }))
}

impl ComparisonModule for SymbolInventoryModule {
    fn name(&self) -> &str {
        "symbol_inventory"
    }

    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome> {
        let folder1 = fw1.path_for(&self.config.folder1);
        let folder2 = fw2.path_for(&self.config.folder2);
        for folder in [&folder1, &folder2] {
            if !folder.is_dir() {
                return Err(FirmsimError::missing_artifact(folder, "symbol inventory folder"));
            }
        }

        let mut mean = WeightedMean::new();
        let mut inventories = IndexMap::new();
        for (file_name, weight) in self.inventories() {
            let comparison = compare_inventory(&folder1, &folder2, file_name, weight)?;
            if let Some(ref c) = comparison {
                mean.add(c.similarity, c.weight);
            }
            inventories.insert(file_name, comparison);
        }

        if inventories.values().all(Option::is_none) {
            return Err(FirmsimError::no_comparable_artifacts(self.name()));
        }

        let similarity = mean.value();
        let details = SymbolInventoryDetails {
            folder1,
            folder2,
            inventories,
            similarity,
        };
        Ok(ModuleOutcome::new(similarity, &details))
    }
}
