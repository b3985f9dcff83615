//! Process-wide dispatch counters.
//!
//! Submissions are counted per execution mode and failures per
//! [`DispatchStage`], so a spike in `submit_command` failures (cluster
//! unreachable) reads differently from one in `interpret_output` (jobs that
//! ran but could not be tracked). Requests for operations other than
//! `runnable.run` are counted as rejections, never as dispatches.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{DispatchError, DispatchStage, ExecutionMode};

pub static METRICS: Metrics = Metrics::new();

/// Failure stages in counter-slot order.
const STAGES: [DispatchStage; 6] = [
    DispatchStage::ValidateOperation,
    DispatchStage::BuildContainerInfo,
    DispatchStage::SubmitCommand,
    DispatchStage::InterpretOutput,
    DispatchStage::RetrieveJobId,
    DispatchStage::BuildMonitoringHandle,
];

fn stage_slot(stage: DispatchStage) -> usize {
    match stage {
        DispatchStage::ValidateOperation => 0,
        DispatchStage::BuildContainerInfo => 1,
        DispatchStage::SubmitCommand => 2,
        DispatchStage::InterpretOutput => 3,
        DispatchStage::RetrieveJobId => 4,
        DispatchStage::BuildMonitoringHandle => 5,
    }
}

pub struct Metrics {
    operations_rejected: AtomicU64,
    dispatches_started: AtomicU64,
    batch_jobs_submitted: AtomicU64,
    interactive_jobs_submitted: AtomicU64,
    failures_by_stage: [AtomicU64; STAGES.len()],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            operations_rejected: AtomicU64::new(0),
            dispatches_started: AtomicU64::new(0),
            batch_jobs_submitted: AtomicU64::new(0),
            interactive_jobs_submitted: AtomicU64::new(0),
            failures_by_stage: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    /// A request named an operation this driver does not run.
    pub fn record_rejected(&self) {
        self.operations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_started(&self) {
        self.dispatches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self, mode: ExecutionMode) {
        let counter = match mode {
            ExecutionMode::Batch => &self.batch_jobs_submitted,
            ExecutionMode::Interactive => &self.interactive_jobs_submitted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed dispatch against the stage it failed in.
    pub fn record_failure(&self, error: &DispatchError) {
        self.failures_by_stage[stage_slot(error.stage)].fetch_add(1, Ordering::Relaxed);
        tracing::trace!(stage = %error.stage, kind = ?error.kind(), "dispatch failure counted");
    }

    pub fn operations_rejected(&self) -> u64 {
        self.operations_rejected.load(Ordering::Relaxed)
    }

    pub fn dispatches_started(&self) -> u64 {
        self.dispatches_started.load(Ordering::Relaxed)
    }

    pub fn jobs_submitted(&self, mode: ExecutionMode) -> u64 {
        match mode {
            ExecutionMode::Batch => self.batch_jobs_submitted.load(Ordering::Relaxed),
            ExecutionMode::Interactive => self.interactive_jobs_submitted.load(Ordering::Relaxed),
        }
    }

    pub fn failures_at(&self, stage: DispatchStage) -> u64 {
        self.failures_by_stage[stage_slot(stage)].load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        STAGES.iter().map(|s| self.failures_at(*s)).sum()
    }

    /// Log the submission counters, then one event per stage that has failed.
    pub fn flush(&self) {
        tracing::info!(
            metric = "dispatch",
            operations_rejected = self.operations_rejected(),
            dispatches_started = self.dispatches_started(),
            batch_jobs_submitted = self.jobs_submitted(ExecutionMode::Batch),
            interactive_jobs_submitted = self.jobs_submitted(ExecutionMode::Interactive),
            failures = self.total_failures(),
        );
        for stage in STAGES {
            let failures = self.failures_at(stage);
            if failures > 0 {
                tracing::info!(metric = "dispatch_failures", stage = %stage, failures);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExecError;

    #[test]
    fn failures_are_counted_per_stage() {
        let m = Metrics::new();
        m.record_failure(&DispatchError::new(
            DispatchStage::SubmitCommand,
            ExecError::MissingJobId,
        ));
        m.record_failure(&DispatchError::new(
            DispatchStage::SubmitCommand,
            ExecError::MissingJobId,
        ));
        m.record_failure(&DispatchError::new(
            DispatchStage::InterpretOutput,
            ExecError::JobIdParse {
                output: String::new(),
            },
        ));

        assert_eq!(m.failures_at(DispatchStage::SubmitCommand), 2);
        assert_eq!(m.failures_at(DispatchStage::InterpretOutput), 1);
        assert_eq!(m.failures_at(DispatchStage::BuildContainerInfo), 0);
        assert_eq!(m.total_failures(), 3);
        m.flush();
    }

    #[test]
    fn submissions_are_counted_per_mode() {
        let m = Metrics::new();
        m.record_started();
        m.record_started();
        m.record_submitted(ExecutionMode::Batch);
        m.record_submitted(ExecutionMode::Interactive);
        m.record_submitted(ExecutionMode::Interactive);

        assert_eq!(m.dispatches_started(), 2);
        assert_eq!(m.jobs_submitted(ExecutionMode::Batch), 1);
        assert_eq!(m.jobs_submitted(ExecutionMode::Interactive), 2);
        assert_eq!(m.operations_rejected(), 0);
    }

    #[test]
    fn every_stage_has_its_own_slot() {
        let slots: std::collections::HashSet<usize> = STAGES.iter().map(|s| stage_slot(*s)).collect();
        assert_eq!(slots.len(), STAGES.len());
    }
}
