//! Run scheduler metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::outcome::RunOutcome;

/// Scheduler counters.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Runs that reached `Executing`.
    pub runs_started: AtomicU64,
    pub runs_completed: AtomicU64,
    pub runs_interrupted: AtomicU64,
    pub runs_completed_and_interrupted: AtomicU64,
    /// Runs ending in an error, including rejected requests.
    pub runs_failed: AtomicU64,
    /// Engine steps across all runs.
    pub steps: AtomicU64,
    pub interrupt_checks: AtomicU64,
    last_run_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        *self.last_run_at.write() = Some(Utc::now());
    }

    pub fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupt_check(&self) {
        self.interrupt_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a run ended.
    pub fn record_outcome(&self, outcome: &RunOutcome) {
        let counter = match outcome {
            RunOutcome::Completed => &self.runs_completed,
            RunOutcome::Interrupted => &self.runs_interrupted,
            RunOutcome::CompletedAndInterrupted => &self.runs_completed_and_interrupted,
            RunOutcome::Error(_) => &self.runs_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> SchedulerMetricsSnapshot {
        SchedulerMetricsSnapshot {
            timestamp: Utc::now(),
            last_run_at: *self.last_run_at.read(),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_interrupted: self.runs_interrupted.load(Ordering::Relaxed),
            runs_completed_and_interrupted: self
                .runs_completed_and_interrupted
                .load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            interrupt_checks: self.interrupt_checks.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scheduler metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerMetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_interrupted: u64,
    pub runs_completed_and_interrupted: u64,
    pub runs_failed: u64,
    pub steps: u64,
    pub interrupt_checks: u64,
}
