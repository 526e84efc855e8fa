//! Fixed-size worker pool feeding comparison results back to a coordinator.

use super::executor::{ChildSlot, ComparisonExecutor};
use super::planner::ComparisonTask;
use crate::error::{FirmsimError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Outcome of one executed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub task_id: Uuid,
    pub base_firmware: String,
    pub target_firmware: String,
    pub label: String,
    pub success: bool,
    pub similarity: f64,
    pub predicted_similar: bool,
    pub expected_similar: bool,
    pub worker_id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pool sizing and timing.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub workers: usize,
    pub poll_interval: Duration,
    pub stall_polls: u32,
    pub grace_period: Duration,
    /// Similarity at or above which a pair is predicted similar
    pub threshold: f64,
}

/// Results collected by [`WorkerPool::run`].
#[derive(Debug, Default)]
pub struct PoolOutcome {
    pub results: Vec<ComparisonResult>,
    /// The stop flag was raised before every result arrived
    pub interrupted: bool,
}

struct Worker {
    handle: JoinHandle<()>,
    slot: Arc<ChildSlot>,
}

/// Runs tasks on `settings.workers` threads.
pub struct WorkerPool {
    executor: Arc<dyn ComparisonExecutor>,
    settings: PoolSettings,
    stop: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(executor: Arc<dyn ComparisonExecutor>, settings: PoolSettings, stop: Arc<AtomicBool>) -> Self {
        Self {
            executor,
            settings,
            stop,
        }
    }

    /// Execute every task and gather the results.
    ///
    /// Returns [`FirmsimError::pool_stalled`] when all workers have exited
    /// while results are still outstanding.
    pub fn run(&self, tasks: Vec<ComparisonTask>) -> Result<PoolOutcome> {
        let expected = tasks.len();
        if expected == 0 {
            return Ok(PoolOutcome::default());
        }

        let (task_tx, task_rx) = mpsc::channel();
        for task in tasks {
            // The receiver is alive, so this cannot fail.
            let _ = task_tx.send(task);
        }
        drop(task_tx);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, result_rx) = mpsc::channel();

        let worker_count = self.settings.workers.clamp(1, expected);
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 1..=worker_count {
            workers.push(self.spawn_worker(worker_id, Arc::clone(&task_rx), result_tx.clone())?);
        }
        drop(result_tx);
        tracing::info!("Started {worker_count} worker(s) for {expected} task(s)");

        let mut outcome = PoolOutcome::default();
        let collected = self.collect(&result_rx, &workers, expected, &mut outcome.results);

        if collected.is_err() || outcome.results.len() < expected {
            outcome.interrupted = self.stop.load(Ordering::Relaxed);
            self.stop.store(true, Ordering::Relaxed);
            self.shutdown(&workers);
            outcome.results.extend(result_rx.try_iter());
        }
        for worker in workers {
            if worker.handle.is_finished() {
                let _ = worker.handle.join();
            }
        }
        collected?;
        Ok(outcome)
    }

    fn spawn_worker(
        &self,
        worker_id: usize,
        tasks: Arc<Mutex<Receiver<ComparisonTask>>>,
        results: Sender<ComparisonResult>,
    ) -> Result<Worker> {
        let slot = Arc::new(ChildSlot::default());
        let executor = Arc::clone(&self.executor);
        let stop = Arc::clone(&self.stop);
        let threshold = self.settings.threshold;
        let worker_slot = Arc::clone(&slot);

        let handle = std::thread::Builder::new()
            .name(format!("firmsim-worker-{worker_id}"))
            .spawn(move || {
                tracing::debug!("Worker {worker_id} started");
                while !stop.load(Ordering::Relaxed) {
                    let next = match tasks.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(task) = next else {
                        break;
                    };
                    let result = run_task(executor.as_ref(), &task, &worker_slot, worker_id, threshold);
                    if results.send(result).is_err() {
                        break;
                    }
                }
                tracing::debug!("Worker {worker_id} exiting");
            })?;
        Ok(Worker { handle, slot })
    }

    fn collect(
        &self,
        rx: &Receiver<ComparisonResult>,
        workers: &[Worker],
        expected: usize,
        results: &mut Vec<ComparisonResult>,
    ) -> Result<()> {
        let mut empty_polls = 0;
        while results.len() < expected {
            if self.stop.load(Ordering::Relaxed) {
                tracing::warn!(
                    "Stop requested with {} of {expected} result(s) collected",
                    results.len()
                );
                return Ok(());
            }
            match rx.recv_timeout(self.settings.poll_interval) {
                Ok(result) => {
                    empty_polls = 0;
                    results.push(result);
                    let done = results.len();
                    if done % 10 == 0 || done == expected {
                        let failed = results.iter().filter(|r| !r.success).count();
                        tracing::info!(
                            "Progress: {done}/{expected} ({:.1}%), {failed} failed",
                            done as f64 * 100.0 / expected as f64
                        );
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    empty_polls += 1;
                    if empty_polls >= self.settings.stall_polls {
                        empty_polls = 0;
                        if workers.iter().all(|w| w.handle.is_finished()) {
                            return Err(FirmsimError::pool_stalled(expected - results.len()));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FirmsimError::pool_stalled(expected - results.len()));
                }
            }
        }
        Ok(())
    }

    /// Wait up to the grace period for workers, then kill straggler children.
    fn shutdown(&self, workers: &[Worker]) {
        let deadline = Instant::now() + self.settings.grace_period;
        while Instant::now() < deadline && workers.iter().any(|w| !w.handle.is_finished()) {
            std::thread::sleep(Duration::from_millis(50));
        }
        for (index, worker) in workers.iter().enumerate() {
            if !worker.handle.is_finished() && worker.slot.kill() {
                tracing::warn!("Killed comparison process of worker {}", index + 1);
            }
        }
    }
}

fn run_task(
    executor: &dyn ComparisonExecutor,
    task: &ComparisonTask,
    slot: &ChildSlot,
    worker_id: usize,
    threshold: f64,
) -> ComparisonResult {
    tracing::info!(
        "Worker {worker_id}: comparing {} with {} (task {}, label {})",
        task.base_firmware,
        task.target_firmware,
        task.task_id,
        task.label
    );
    let (success, similarity, error) = match executor.execute(task, slot) {
        Ok(similarity) => (true, similarity, None),
        Err(e) => {
            let message = e.detailed_message();
            tracing::error!("Task {} failed: {message}", task.task_id);
            (false, 0.0, Some(message))
        }
    };
    let predicted_similar = success && similarity >= threshold;
    if success {
        tracing::info!(
            "{} vs {}: similarity {similarity:.4}, expected {}, predicted {}",
            task.base_firmware,
            task.target_firmware,
            verdict(task.expected_similar),
            verdict(predicted_similar)
        );
    }
    ComparisonResult {
        task_id: task.task_id,
        base_firmware: task.base_firmware.clone(),
        target_firmware: task.target_firmware.clone(),
        label: task.label.clone(),
        success,
        similarity,
        predicted_similar,
        expected_similar: task.expected_similar,
        worker_id,
        error,
    }
}

const fn verdict(similar: bool) -> &'static str {
    if similar {
        "similar"
    } else {
        "dissimilar"
    }
}
