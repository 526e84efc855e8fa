//! Integration tests for firmsim
//!
//! These tests run the full module set over synthetic firmware feature
//! trees and check aggregation, persistence and module selection.

mod common;

use common::{write_firmware, Flavor};
use firmsim::{
    config::load_config_file, AppConfig, ComparisonOrchestrator, ComparisonSummary,
    FeatureLocation, ModuleKind,
};
use std::path::Path;
use tempfile::TempDir;

fn in_memory() -> ComparisonOrchestrator {
    let config = AppConfig::builder().persist(false).build();
    ComparisonOrchestrator::from_config(&config, None).unwrap()
}

fn locate(path: &Path) -> FeatureLocation {
    FeatureLocation::resolve(path, None)
}

// ============================================================================
// Aggregation
// ============================================================================

mod aggregation_tests {
    use super::*;

    #[test]
    fn test_identical_feature_directories_score_one() {
        let tmp = TempDir::new().unwrap();
        let fw1 = write_firmware(tmp.path(), "fw_a", Flavor::Router);
        let fw2 = write_firmware(tmp.path(), "fw_b", Flavor::Router);

        let outcome = in_memory().compare(&locate(&fw1), &locate(&fw2)).unwrap();
        for (name, result) in &outcome.summary.results {
            assert!(result.success, "{name} failed: {:?}", result.error);
            assert!((result.similarity - 1.0).abs() < 1e-9, "{name}: {}", result.similarity);
        }
        assert_eq!(outcome.summary.results.len(), ModuleKind::ALL.len());
        assert!((outcome.total_similarity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_root_scores_one() {
        let tmp = TempDir::new().unwrap();
        let fw = locate(&write_firmware(tmp.path(), "fw_a", Flavor::Camera));

        let outcome = in_memory().compare(&fw, &fw).unwrap();
        assert_eq!(outcome.summary.results["filesystem_profile"].similarity, 1.0);
        assert!((outcome.total_similarity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_related_firmware_ranks_above_unrelated() {
        let tmp = TempDir::new().unwrap();
        let router = locate(&write_firmware(tmp.path(), "router", Flavor::Router));
        let revision = locate(&write_firmware(tmp.path(), "router_v2", Flavor::RouterRevision));
        let camera = locate(&write_firmware(tmp.path(), "camera", Flavor::Camera));

        let orchestrator = in_memory();
        let related = orchestrator.compare(&router, &revision).unwrap().total_similarity();
        let unrelated = orchestrator.compare(&router, &camera).unwrap().total_similarity();
        assert!(related > unrelated, "related {related} <= unrelated {unrelated}");
        assert!(related < 1.0);
        assert!((0.0..=1.0).contains(&unrelated));
    }

    #[test]
    fn test_missing_artifact_fails_only_its_module() {
        let tmp = TempDir::new().unwrap();
        let fw1 = write_firmware(tmp.path(), "fw_a", Flavor::Router);
        let fw2 = write_firmware(tmp.path(), "fw_b", Flavor::Router);
        std::fs::remove_file(fw2.join("output_json/fw_b/param_link.json")).unwrap();

        let outcome = in_memory().compare(&locate(&fw1), &locate(&fw2)).unwrap();
        let param = &outcome.summary.results["param_chain"];
        assert!(!param.success);
        assert_eq!(param.similarity, 0.0);
        assert!(param.error.as_deref().unwrap().contains("param_link.json"));

        // 0.3 of the default weight is lost, the rest still scores 1.0
        assert!((outcome.total_similarity() - 0.7).abs() < 1e-9);
        assert!(outcome.details["param_chain"]["error"].is_string());
    }
}

// ============================================================================
// Module selection
// ============================================================================

mod selection_tests {
    use super::*;

    #[test]
    fn test_module_filter_overrides_enabled_set() {
        let tmp = TempDir::new().unwrap();
        let fw1 = locate(&write_firmware(tmp.path(), "fw_a", Flavor::Router));
        let fw2 = locate(&write_firmware(tmp.path(), "fw_b", Flavor::Camera));

        let mut config = AppConfig::builder().persist(false).build();
        config.modules.binwalk.enabled = false;
        let filter = vec!["param_chain".to_string(), "binwalk".to_string()];
        let orchestrator = ComparisonOrchestrator::from_config(&config, Some(&filter)).unwrap();

        let outcome = orchestrator.compare(&fw1, &fw2).unwrap();
        assert_eq!(outcome.summary.modules, vec!["binwalk", "param_chain"]);
    }

    #[test]
    fn test_unknown_module_rejected() {
        let config = AppConfig::default();
        let filter = vec!["nope".to_string()];
        let err = ComparisonOrchestrator::from_config(&config, Some(&filter)).unwrap_err();
        assert!(err.detailed_message().contains("nope"));
    }

    #[test]
    fn test_yaml_weights_reach_the_registry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".firmsim.yaml");
        std::fs::write(
            &path,
            "modules:\n  binwalk:\n    weight: 2.0\n  ghidra:\n    enabled: false\n",
        )
        .unwrap();
        let config = load_config_file(&path).unwrap();
        let orchestrator = ComparisonOrchestrator::from_config(&config, None).unwrap();

        let registry = orchestrator.registry();
        assert_eq!(registry.len(), 4);
        assert!(!registry.names().contains(&"symbol_inventory".to_string()));
        // 2.0 + 0.3 + 0.3 + 0.2
        assert!((registry.total_weight() - 2.8).abs() < 1e-9);
    }
}

// ============================================================================
// Persistence
// ============================================================================

mod persistence_tests {
    use super::*;

    #[test]
    fn test_results_written_per_module_and_summary() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let results = tmp.path().join("results");
        let fw1 = locate(&write_firmware(&data, "fw_a", Flavor::Router));
        let fw2 = locate(&write_firmware(&data, "fw_b", Flavor::RouterRevision));

        let config = AppConfig::builder().result_dir(&results).build();
        let outcome = ComparisonOrchestrator::from_config(&config, None)
            .unwrap()
            .compare(&fw1, &fw2)
            .unwrap();

        let dir = outcome.output_dir.clone().unwrap();
        assert!(dir.starts_with(&results));
        for kind in ModuleKind::ALL {
            let name = kind.name();
            let details = dir.join(name).join(format!("{name}_details.json"));
            assert!(details.is_file(), "missing {}", details.display());
        }

        let summary = ComparisonSummary::load(&dir.join("comparison_summary.json")).unwrap();
        assert_eq!(summary.firmware1, "fw_a");
        assert_eq!(summary.firmware2_dir, "fw_b");
        assert_eq!(summary.firmware1_path, data.join("fw_a"));
        assert!((summary.total_similarity - outcome.total_similarity()).abs() < 1e-12);
        assert_eq!(summary.results.len(), ModuleKind::ALL.len());
    }
}
