//! End-to-end tests for the batch evaluator with the in-process executor.

mod common;

use common::{write_firmware, Flavor};
use firmsim::batch::{InProcessExecutor, PriorResults};
use firmsim::{AppConfig, BatchEvaluator, ComparisonOrchestrator, Dataset, FirmwarePair};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

struct Workspace {
    _tmp: TempDir,
    data: PathBuf,
    results: PathBuf,
    logs: PathBuf,
}

fn workspace() -> Workspace {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    write_firmware(&data, "router", Flavor::Router);
    write_firmware(&data, "router_v2", Flavor::RouterRevision);
    write_firmware(&data, "camera", Flavor::Camera);
    Workspace {
        results: tmp.path().join("results"),
        logs: tmp.path().join("logs"),
        data,
        _tmp: tmp,
    }
}

fn evaluator(ws: &Workspace, csv: &str) -> BatchEvaluator {
    let mut config = AppConfig::builder()
        .result_dir(&ws.results)
        .logs_dir(&ws.logs)
        .workers(2)
        .build();
    config.batch.poll_interval_ms = 20;

    let orchestrator = ComparisonOrchestrator::from_config(&config, None).unwrap();
    let executor = Arc::new(InProcessExecutor::new(orchestrator, &ws.data));
    BatchEvaluator::new(config, Dataset::parse(csv, 1), &ws.data, executor)
}

const DATASET: &str = "id,label,base,target\n0,vendor_x,router,router_v2\n";

fn stored_pairs(results: &Path) -> Vec<FirmwarePair> {
    PriorResults::scan(results)
        .iter_sorted()
        .into_iter()
        .map(|(pair, _)| pair.clone())
        .collect()
}

// ============================================================================
// Fresh runs
// ============================================================================

mod fresh_run_tests {
    use super::*;

    #[test]
    fn test_every_corpus_pair_with_a_base_is_compared() {
        let ws = workspace();
        let summary = evaluator(&ws, DATASET).run().unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.summary.total_comparisons, 2);
        assert_eq!(summary.summary.enqueued, 2);
        assert_eq!(summary.summary.completed, 2);
        assert_eq!(summary.summary.failed, 0);
        assert_eq!(summary.summary.skipped, 0);
        assert_eq!(summary.confusion.total(), 2);

        for result in &summary.results {
            assert!(result.success, "{:?}", result.error);
            assert_eq!(result.base_firmware, "router");
            assert_eq!(result.label, "vendor_x");
            assert_eq!(result.expected_similar, result.target_firmware == "router_v2");
            assert_eq!(
                result.predicted_similar,
                result.similarity >= summary.similarity_threshold
            );
        }

        assert_eq!(
            stored_pairs(&ws.results),
            vec![
                FirmwarePair::new("camera", "router"),
                FirmwarePair::new("router", "router_v2"),
            ]
        );
    }

    #[test]
    fn test_related_pair_scores_higher() {
        let ws = workspace();
        let summary = evaluator(&ws, DATASET).run().unwrap();
        let similarity_of = |target: &str| {
            summary
                .results
                .iter()
                .find(|r| r.target_firmware == target)
                .map(|r| r.similarity)
                .unwrap()
        };
        assert!(similarity_of("router_v2") > similarity_of("camera"));
    }

    #[test]
    fn test_missing_base_reported() {
        let ws = workspace();
        let csv = "id,label,base,target\n0,vendor_x,router,router_v2\n1,vendor_y,ghost,camera\n";
        let summary = evaluator(&ws, csv).run().unwrap();

        assert_eq!(summary.missing_firmwares, vec!["ghost".to_string()]);
        assert_eq!(summary.summary.total_comparisons, 2);
    }

    #[test]
    fn test_stop_before_start_runs_nothing() {
        let ws = workspace();
        let stop = Arc::new(AtomicBool::new(true));
        let summary = evaluator(&ws, DATASET).with_stop_flag(stop).run().unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.summary.enqueued, 2);
        assert!(summary.results.is_empty());
    }
}

// ============================================================================
// Reuse of stored results
// ============================================================================

mod reuse_tests {
    use super::*;

    #[test]
    fn test_second_run_reuses_stored_results() {
        let ws = workspace();
        let first = evaluator(&ws, DATASET).run().unwrap();
        let second = evaluator(&ws, DATASET).run().unwrap();

        assert_eq!(second.summary.total_comparisons, 2);
        assert_eq!(second.summary.enqueued, 0);
        assert_eq!(second.summary.skipped, 2);
        assert_eq!(second.summary.skipped_due_to_missing, 0);
        assert!(second.results.is_empty());
        assert_eq!(second.reused.len(), 2);

        assert_eq!(second.confusion.true_positives, first.confusion.true_positives);
        assert_eq!(second.confusion.false_positives, first.confusion.false_positives);
        assert_eq!(second.confusion.true_negatives, first.confusion.true_negatives);
        assert_eq!(second.confusion.false_negatives, first.confusion.false_negatives);

        for reused in &second.reused {
            let fresh = first
                .results
                .iter()
                .find(|r| FirmwarePair::new(r.base_firmware.clone(), r.target_firmware.clone()) == reused.pair)
                .unwrap();
            assert!((fresh.similarity - reused.similarity).abs() < 1e-9);
        }
    }

    #[test]
    fn test_summary_file_written_to_logs() {
        let ws = workspace();
        let summary = evaluator(&ws, DATASET).run().unwrap();
        let path = summary.write(&ws.logs).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("batch_comparison_results_"), "{name}");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["completed"], 2);
        assert!(json["metrics"]["precision"].is_number());
    }
}
