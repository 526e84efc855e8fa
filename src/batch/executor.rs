//! Strategies for running one comparison task.

use super::planner::ComparisonTask;
use crate::error::{FirmsimError, Result};
use crate::features::FeatureLocation;
use crate::orchestrator::{ComparisonOrchestrator, ComparisonSummary, SUMMARY_FILE_NAME};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

/// Holds the child process a worker is currently waiting on, so the
/// coordinator can kill it on shutdown.
#[derive(Debug, Default)]
pub struct ChildSlot(Mutex<Option<Child>>);

impl ChildSlot {
    fn put(&self, child: Child) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(child);
        }
    }

    fn take(&self) -> Option<Child> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Kill the running child, if any. Returns whether one was killed.
    pub fn kill(&self) -> bool {
        let Ok(mut slot) = self.0.lock() else {
            return false;
        };
        match slot.as_mut() {
            Some(child) => child.kill().is_ok(),
            None => false,
        }
    }
}

/// Runs a comparison task and returns the overall similarity.
pub trait ComparisonExecutor: Send + Sync {
    fn execute(&self, task: &ComparisonTask, slot: &ChildSlot) -> Result<f64>;
}

// ============================================================================
// In-process
// ============================================================================

/// Runs the orchestrator on the calling thread.
#[derive(Debug)]
pub struct InProcessExecutor {
    orchestrator: ComparisonOrchestrator,
    data_dir: PathBuf,
}

impl InProcessExecutor {
    pub fn new(orchestrator: ComparisonOrchestrator, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            orchestrator,
            data_dir: data_dir.into(),
        }
    }
}

impl ComparisonExecutor for InProcessExecutor {
    fn execute(&self, task: &ComparisonTask, _slot: &ChildSlot) -> Result<f64> {
        let fw1 = FeatureLocation::resolve(self.data_dir.join(&task.base_firmware), None);
        let fw2 = FeatureLocation::resolve(self.data_dir.join(&task.target_firmware), None);
        let outcome = self
            .orchestrator
            .compare(&fw1, &fw2)
            .map_err(|e| FirmsimError::task_execution(task.task_id.to_string(), e.detailed_message()))?;
        Ok(outcome.total_similarity())
    }
}

// ============================================================================
// Subprocess
// ============================================================================

/// Spawns `<program> compare <fw1> <fw2> --output-dir <result_dir> --json`.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    program: PathBuf,
    data_dir: PathBuf,
    result_dir: PathBuf,
    logs_dir: Option<PathBuf>,
    config_file: Option<PathBuf>,
    modules: Vec<String>,
}

impl SubprocessExecutor {
    pub fn new(program: impl Into<PathBuf>, data_dir: impl Into<PathBuf>, result_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            data_dir: data_dir.into(),
            result_dir: result_dir.into(),
            logs_dir: None,
            config_file: None,
            modules: Vec::new(),
        }
    }

    /// Executor that re-invokes the running binary.
    pub fn current_exe(data_dir: impl Into<PathBuf>, result_dir: impl Into<PathBuf>) -> Result<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, data_dir, result_dir))
    }

    /// Capture each child's stderr into a per-comparison log file here.
    #[must_use]
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    /// Pass `--config <path>` to every child.
    #[must_use]
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Pass `--modules a,b` to every child.
    #[must_use]
    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = modules;
        self
    }

    fn command(&self, task: &ComparisonTask) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("compare")
            .arg(self.data_dir.join(&task.base_firmware))
            .arg(self.data_dir.join(&task.target_firmware))
            .arg("--output-dir")
            .arg(&self.result_dir)
            .arg("--json");
        if let Some(ref config) = self.config_file {
            cmd.arg("--config").arg(config);
        }
        if !self.modules.is_empty() {
            cmd.arg("--modules").arg(self.modules.join(","));
        }
        cmd
    }

    fn stderr_target(&self, task: &ComparisonTask) -> Stdio {
        let Some(ref dir) = self.logs_dir else {
            return Stdio::null();
        };
        let name = format!(
            "comparison_{}_{}_{}.log",
            task.base_firmware,
            task.target_firmware,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        match std::fs::create_dir_all(dir).and_then(|()| std::fs::File::create(dir.join(name))) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                tracing::warn!("Cannot create comparison log in {}: {e}", dir.display());
                Stdio::null()
            }
        }
    }
}

impl ComparisonExecutor for SubprocessExecutor {
    fn execute(&self, task: &ComparisonTask, slot: &ChildSlot) -> Result<f64> {
        let task_id = task.task_id.to_string();
        let mut child = self
            .command(task)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(self.stderr_target(task))
            .spawn()
            .map_err(|e| FirmsimError::task_execution(&task_id, format!("spawn failed: {e}")))?;

        let stdout = child.stdout.take();
        slot.put(child);

        let mut output = String::new();
        if let Some(mut stdout) = stdout {
            if let Err(e) = stdout.read_to_string(&mut output) {
                tracing::warn!("Task {task_id}: reading child output failed: {e}");
            }
        }

        let status = match slot.take() {
            Some(mut child) => child
                .wait()
                .map_err(|e| FirmsimError::task_execution(&task_id, format!("wait failed: {e}")))?,
            None => return Err(FirmsimError::task_execution(&task_id, "child handle lost")),
        };
        if !status.success() {
            return Err(FirmsimError::task_execution(
                &task_id,
                format!("compare exited with {status}"),
            ));
        }

        parse_similarity(&output)
            .or_else(|| newest_summary_similarity(&self.result_dir, &task.base_firmware, &task.target_firmware))
            .ok_or_else(|| FirmsimError::task_execution(&task_id, "no similarity in compare output"))
    }
}

/// `total_similarity` from the last JSON line of `output`.
pub(crate) fn parse_similarity(output: &str) -> Option<f64> {
    output.lines().rev().find_map(|line| {
        let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
        value.get("total_similarity")?.as_f64()
    })
}

/// Similarity from the newest result directory named after the pair.
pub(crate) fn newest_summary_similarity(result_dir: &Path, fw1: &str, fw2: &str) -> Option<f64> {
    let prefixes = [format!("{fw1}_{fw2}_"), format!("{fw2}_{fw1}_")];
    // (stamp, dir name), newest stamp first
    let mut dirs: Vec<(String, String)> = std::fs::read_dir(result_dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter_map(|name| {
            let stamp = prefixes.iter().find_map(|p| name.strip_prefix(p.as_str()))?;
            Some((stamp.to_string(), name))
        })
        .collect();
    dirs.sort_by(|a, b| b.cmp(a));
    dirs.iter().find_map(|(_, dir)| {
        ComparisonSummary::load(&result_dir.join(dir).join(SUMMARY_FILE_NAME))
            .ok()
            .map(|s| s.total_similarity)
    })
}
