//! Filesystem profile comparison.
//!
//! Three weighted dimensions: structural layout and sensitive resources from
//! the `output.json` summary, and binary signatures from the unpacked tree
//! and string dumps. Comparing a root with itself always scores 1.0.

mod binary;
mod fuzzy;
mod sensitive;
mod strings;
mod structure;

use super::{ComparisonModule, ModuleOutcome};
use crate::config::FilesystemProfileConfig;
use crate::error::Result;
use crate::features::{load_json, to_set, FeatureLocation, FirmwareProfile};
use crate::similarity::{set_similarity, WeightedMean};
use serde::Serialize;
use std::path::PathBuf;

/// Filesystem-profile comparison.
#[derive(Debug, Clone)]
pub struct FilesystemProfileModule {
    config: FilesystemProfileConfig,
}

#[derive(Debug, Serialize)]
struct Weights {
    structure: f64,
    sensitive: f64,
    binary: f64,
}

#[derive(Debug, Serialize)]
struct FilesystemDetails {
    firmware1_path: PathBuf,
    firmware2_path: PathBuf,
    firmware1_dir: String,
    firmware2_dir: String,
    identical_roots: bool,
    similarity: f64,
    weights: Weights,
    #[serde(skip_serializing_if = "Option::is_none")]
    structural_layout: Option<structure::StructureComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensitive_resources: Option<sensitive::SensitiveComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    binary_signatures: Option<binary::BinaryComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// SetSimilarity of two optional lists; `None` when absent on both sides,
/// a single absent side counting as empty.
fn optional_list_similarity(a: Option<&Vec<String>>, b: Option<&Vec<String>>) -> Option<f64> {
    if a.is_none() && b.is_none() {
        return None;
    }
    let a = to_set(a).unwrap_or_default();
    let b = to_set(b).unwrap_or_default();
    Some(set_similarity(&a, &b))
}

impl FilesystemProfileModule {
    #[must_use]
    pub fn new(config: FilesystemProfileConfig) -> Self {
        Self { config }
    }

    fn weights(&self) -> Weights {
        Weights {
            structure: self.config.structure_weight,
            sensitive: self.config.sensitive_weight,
            binary: self.config.binary_weight,
        }
    }

    fn details(&self, fw1: &FeatureLocation, fw2: &FeatureLocation, identical_roots: bool) -> FilesystemDetails {
        FilesystemDetails {
            firmware1_path: fw1.root().to_path_buf(),
            firmware2_path: fw2.root().to_path_buf(),
            firmware1_dir: fw1.firmware_dir().to_string(),
            firmware2_dir: fw2.firmware_dir().to_string(),
            identical_roots,
            similarity: 0.0,
            weights: self.weights(),
            structural_layout: None,
            sensitive_resources: None,
            binary_signatures: None,
            error: None,
        }
    }

    fn score(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
        identical_roots: bool,
    ) -> Result<FilesystemDetails> {
        let p1: FirmwareProfile =
            load_json(&fw1.path_for(&self.config.output_file1), "filesystem profile")?;
        let p2: FirmwareProfile =
            load_json(&fw2.path_for(&self.config.output_file2), "filesystem profile")?;

        let structure = structure::compare(&p1, &p2);
        let sensitive = sensitive::compare(&p1, &p2);
        let binary = binary::compare(fw1, fw2, &p1, &p2, &self.config, identical_roots)?;

        let weights = self.weights();
        let mut mean = WeightedMean::new();
        mean.add(structure.similarity, weights.structure);
        mean.add(sensitive.similarity, weights.sensitive);
        mean.add(binary.similarity, weights.binary);

        tracing::debug!(
            structure = structure.similarity,
            sensitive = sensitive.similarity,
            binary = binary.similarity,
            "filesystem profile dimensions"
        );

        let mut details = self.details(fw1, fw2, identical_roots);
        details.similarity = if identical_roots { 1.0 } else { mean.value() };
        details.structural_layout = Some(structure);
        details.sensitive_resources = Some(sensitive);
        details.binary_signatures = Some(binary);
        Ok(details)
    }
}

impl ComparisonModule for FilesystemProfileModule {
    fn name(&self) -> &str {
        "filesystem_profile"
    }

    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome> {
        let identical_roots = fw1.same_root(fw2);
        let details = match self.score(fw1, fw2, identical_roots) {
            Ok(details) => details,
            Err(e) if identical_roots => {
                tracing::warn!("Filesystem profile incomplete for identical roots: {e}");
                let mut details = self.details(fw1, fw2, true);
                details.similarity = 1.0;
                details.error = Some(e.to_string());
                details
            }
            Err(e) => return Err(e),
        };
        Ok(ModuleOutcome::new(details.similarity, &details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn firmware(tmp: &TempDir, name: &str, profile: Option<serde_json::Value>) -> FeatureLocation {
        let dir = tmp.path().join(name).join("output_json").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(profile) = profile {
            std::fs::write(dir.join("output.json"), profile.to_string()).unwrap();
        }
        FeatureLocation::resolve(tmp.path().join(name), None)
    }

    #[test]
    fn test_identical_root_without_profile_scores_one() {
        let tmp = TempDir::new().unwrap();
        let fw = firmware(&tmp, "fw", None);
        let outcome = FilesystemProfileModule::new(FilesystemProfileConfig::default())
            .calculate_similarity(&fw, &fw)
            .unwrap();
        assert_eq!(outcome.similarity, 1.0);
        assert!(outcome.details["error"].is_string());
    }

    #[test]
    fn test_missing_profile_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", Some(json!({})));
        let fw2 = firmware(&tmp, "fw2", None);
        let err = FilesystemProfileModule::new(FilesystemProfileConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap_err();
        assert!(err.is_missing_artifact());
    }

    #[test]
    fn test_weighted_dimensions() {
        let tmp = TempDir::new().unwrap();
        let profile = json!({
            "directory_structure_info": ["/bin", "/etc"],
            "file_set": ["busybox", "httpd"],
            "architecture": "mips",
            "filesystem": "squashfs",
            "operating_system": "linux",
            "urls": ["http://vendor"]
        });
        let fw1 = firmware(&tmp, "fw1", Some(profile.clone()));
        let fw2 = firmware(&tmp, "fw2", Some(profile));

        let outcome = FilesystemProfileModule::new(FilesystemProfileConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap();
        // structure 1.0, sensitive 1.0 (urls only), binary 0.0 (no terms)
        assert!((outcome.similarity - 0.6).abs() < 1e-9);
        assert_eq!(outcome.details["identical_roots"], false);
    }
}
