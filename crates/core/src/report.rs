//! Reporting sink
//!
//! The job driver pushes lifecycle, progress and per-item events into a
//! [`ReportSink`] passed in by the caller. Rendering (progress bars, log
//! lines, JSON) is up to the implementation.

use crate::aggregate::{JobSummary, Operation};
use crate::job::JobState;
use crate::task::TransferOutcome;

/// Receiver of job events. Every method defaults to doing nothing.
pub trait ReportSink: Send + Sync {
    fn state_changed(&self, _state: JobState) {}

    /// Enumeration finished and `items` tasks totalling `total_bytes` are
    /// about to run
    fn job_started(&self, _operation: Operation, _items: usize, _total_bytes: u64, _dry_run: bool) {}

    /// A submission batch of `tasks` items was handed to the workers
    fn batch_submitted(&self, _tasks: usize) {}

    /// Called once per task, in completion order
    fn item_finished(&self, _outcome: &TransferOutcome) {}

    fn job_finished(&self, _summary: &JobSummary) {}
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {}
