//! Exposed interface paths and request parameter names.

use super::{sorted_sample, ComparisonModule, ModuleOutcome};
use crate::config::InterfaceExposureConfig;
use crate::error::{FirmsimError, Result};
use crate::features::{read_line_set, FeatureLocation, OUTPUT_JSON_DIR};
use crate::similarity::{cosine_similarity, set_similarity, shannon_entropy, shannon_entropy_of_chars};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const COMMON_INTERFACE_SAMPLE: usize = 100;

/// Interface-exposure comparison.
#[derive(Debug, Clone)]
pub struct InterfaceExposureModule {
    config: InterfaceExposureConfig,
}

/// `[N_u, N_k, mean depth, prefix entropy, parameter character entropy]`
type StructuralSummary = [f64; 5];

#[derive(Debug, Serialize)]
struct InterfaceDetails {
    interface_file1: Option<PathBuf>,
    interface_file2: Option<PathBuf>,
    param_file1: Option<PathBuf>,
    param_file2: Option<PathBuf>,
    interface_similarity: f64,
    param_similarity: f64,
    structural_summary_vector1: StructuralSummary,
    structural_summary_vector2: StructuralSummary,
    structural_summary_similarity: f64,
    weights: Weights,
    common_interfaces_count: usize,
    common_interfaces_sample: Vec<String>,
    similarity: f64,
}

#[derive(Debug, Serialize)]
struct Weights {
    api: f64,
    param: f64,
    structural: f64,
}

impl InterfaceExposureModule {
    #[must_use]
    pub fn new(config: InterfaceExposureConfig) -> Self {
        Self { config }
    }

    fn interface_file(&self, fw: &FeatureLocation) -> Option<PathBuf> {
        fw.first_existing(&self.config.interface_candidates).or_else(|| {
            let fallback = fw.path_for(&self.config.fallback_interface_file);
            if fallback.is_file() {
                tracing::debug!(
                    "{}: using {} for interface paths",
                    fw.firmware_name(),
                    fallback.display()
                );
                Some(fallback)
            } else {
                None
            }
        })
    }
}

impl ComparisonModule for InterfaceExposureModule {
    fn name(&self) -> &str {
        "interface_exposure"
    }

    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome> {
        let interface_file1 = self.interface_file(fw1);
        let interface_file2 = self.interface_file(fw2);
        let param_file1 = fw1.first_existing(&self.config.param_candidates);
        let param_file2 = fw2.first_existing(&self.config.param_candidates);

        let interfaces_paired = interface_file1.is_some() && interface_file2.is_some();
        let params_paired = param_file1.is_some() && param_file2.is_some();
        if !interfaces_paired {
            tracing::warn!("No interface path files found on both sides");
        }
        if !params_paired {
            tracing::warn!("No parameter name files found on both sides");
        }
        if !interfaces_paired && !params_paired {
            return Err(FirmsimError::missing_artifact(
                fw1.root().join(OUTPUT_JSON_DIR).join(fw1.firmware_dir()),
                "interface path and parameter name files",
            ));
        }

        // Each side is read on its own; the structural summary describes
        // whatever that firmware has even when the other side lacks the file.
        let api1 = read_side(interface_file1.as_deref())?;
        let api2 = read_side(interface_file2.as_deref())?;
        let param1 = read_side(param_file1.as_deref())?;
        let param2 = read_side(param_file2.as_deref())?;

        let interface_similarity = if interfaces_paired {
            set_similarity(&api1, &api2)
        } else {
            0.0
        };
        let param_similarity = if params_paired {
            set_similarity(&param1, &param2)
        } else {
            0.0
        };

        let phi1 = structural_summary(&api1, &param1);
        let phi2 = structural_summary(&api2, &param2);
        let structural_summary_similarity = cosine_similarity(&phi1, &phi2);

        let weights = Weights {
            api: self.config.api_weight,
            param: self.config.param_weight,
            structural: self.config.structural_summary_weight,
        };
        let similarity = interface_similarity * weights.api
            + param_similarity * weights.param
            + structural_summary_similarity * weights.structural;

        let common: Vec<&String> = api1.intersection(&api2).collect();

        let details = InterfaceDetails {
            interface_file1,
            interface_file2,
            param_file1,
            param_file2,
            interface_similarity,
            param_similarity,
            structural_summary_vector1: phi1,
            structural_summary_vector2: phi2,
            structural_summary_similarity,
            weights,
            common_interfaces_count: common.len(),
            common_interfaces_sample: sorted_sample(common, COMMON_INTERFACE_SAMPLE),
            similarity,
        };
        Ok(ModuleOutcome::new(similarity, &details))
    }
}

/// Lines of one side's file; an unresolved file reads as empty.
fn read_side(file: Option<&Path>) -> Result<HashSet<String>> {
    file.map_or_else(|| Ok(HashSet::new()), read_line_set)
}

/// First meaningful path segment: `/cgi-bin/x` gives `cgi-bin`, `./a/b` gives `a`.
fn path_prefix(path: &str) -> Option<&str> {
    path.split('/').find(|part| !part.is_empty() && *part != ".")
}

fn structural_summary(interfaces: &HashSet<String>, params: &HashSet<String>) -> StructuralSummary {
    let n_u = interfaces.len();
    let n_k = params.len();

    let mean_depth = if n_u > 0 {
        let total: usize = interfaces.iter().map(|p| p.matches('/').count()).sum();
        total as f64 / n_u as f64
    } else {
        0.0
    };

    let prefix_entropy = shannon_entropy(interfaces.iter().filter_map(|p| path_prefix(p)));

    // Set iteration order does not affect the character distribution
    let joined: String = params.iter().map(String::as_str).collect();
    let key_entropy = shannon_entropy_of_chars(&joined);

    [n_u as f64, n_k as f64, mean_depth, prefix_entropy, key_entropy]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn firmware(tmp: &TempDir, name: &str, files: &[(&str, &str)]) -> FeatureLocation {
        let dir = tmp.path().join(name).join("output_json").join(name);
        for (rel, content) in files {
            let path = dir.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        FeatureLocation::resolve(tmp.path().join(name), None)
    }

    const API: &str = "keyword_extract_result/simple/API_simple.result";
    const PARAM: &str = "keyword_extract_result/simple/Prar_simple.result";

    #[test]
    fn test_structural_summary_vector() {
        let interfaces: HashSet<String> = ["/cgi-bin/login", "/cgi-bin/logout", "api/v1/status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let params: HashSet<String> = ["ab"].iter().map(|s| s.to_string()).collect();

        let phi = structural_summary(&interfaces, &params);
        assert_eq!(phi[0], 3.0);
        assert_eq!(phi[1], 1.0);
        assert!((phi[2] - 6.0 / 3.0).abs() < 1e-12);
        // prefixes: cgi-bin x2, api x1
        let expected = -(2.0 / 3.0f64) * (2.0 / 3.0f64).log2() - (1.0 / 3.0f64) * (1.0 / 3.0f64).log2();
        assert!((phi[3] - expected).abs() < 1e-12);
        assert!((phi[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_path_prefix() {
        assert_eq!(path_prefix("/cgi-bin/test"), Some("cgi-bin"));
        assert_eq!(path_prefix("./a/b"), Some("a"));
        assert_eq!(path_prefix("login.cgi"), Some("login.cgi"));
        assert_eq!(path_prefix("/"), None);
    }

    #[test]
    fn test_identical_inventories_score_one() {
        let tmp = TempDir::new().unwrap();
        let files = [(API, "/a\n/b/c\n"), (PARAM, "user\npass\n")];
        let fw1 = firmware(&tmp, "fw1", &files);
        let fw2 = firmware(&tmp, "fw2", &files);

        let outcome = InterfaceExposureModule::new(InterfaceExposureConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap();
        assert!((outcome.similarity - 1.0).abs() < 1e-9);
        assert_eq!(outcome.details["common_interfaces_count"], 2);
    }

    #[test]
    fn test_func_name_fallback_per_side() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", &[(API, "/a\n")]);
        let fw2 = firmware(&tmp, "fw2", &[("func_name.txt", "/a\n")]);

        let outcome = InterfaceExposureModule::new(InterfaceExposureConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap();
        let file2 = outcome.details["interface_file2"].as_str().unwrap();
        assert!(Path::new(file2).ends_with("func_name.txt"));
        assert_eq!(outcome.details["interface_similarity"], 1.0);
        assert_eq!(outcome.details["param_similarity"], 0.0);
    }

    #[test]
    fn test_one_sided_interface_file_still_shapes_its_summary() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", &[(API, "/a\n/b/c\n/d\n"), (PARAM, "user\npass\n")]);
        let fw2 = firmware(&tmp, "fw2", &[(PARAM, "user\npass\n")]);

        let outcome = InterfaceExposureModule::new(InterfaceExposureConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap();
        let details = &outcome.details;
        assert_eq!(details["structural_summary_vector1"][0], 3.0);
        assert_eq!(details["structural_summary_vector2"][0], 0.0);
        assert_eq!(details["interface_similarity"], 0.0);
        assert_eq!(details["param_similarity"], 1.0);
        assert!(details["interface_file2"].is_null());

        let sim_stat = details["structural_summary_similarity"].as_f64().unwrap();
        assert!(sim_stat < 1.0 - 1e-6, "{sim_stat}");
        assert!(outcome.similarity < 2.0 / 3.0 - 1e-6, "{}", outcome.similarity);
    }

    #[test]
    fn test_no_pairs_is_missing_artifact() {
        let tmp = TempDir::new().unwrap();
        let fw1 = firmware(&tmp, "fw1", &[(API, "/a\n")]);
        let fw2 = firmware(&tmp, "fw2", &[(PARAM, "x\n")]);

        let err = InterfaceExposureModule::new(InterfaceExposureConfig::default())
            .calculate_similarity(&fw1, &fw2)
            .unwrap_err();
        assert!(err.is_missing_artifact());
    }
}
