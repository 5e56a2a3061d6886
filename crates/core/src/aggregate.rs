//! Outcome aggregation
//!
//! Outcomes are folded one at a time as they complete; nothing is buffered.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::task::TransferOutcome;

/// Job operation, used to label summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::Delete => "delete",
        }
    }

    /// Capitalized label for progress bars and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Upload => "Upload",
            Operation::Download => "Download",
            Operation::Delete => "Delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final tally of a job, computed once at the end
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub operation: Operation,
    /// Outcomes seen, successful or not
    pub total_files: u64,
    /// Bytes moved by successful items
    pub total_bytes: u64,
    pub duration_seconds: f64,
    pub failures: u64,
    pub skipped: u64,
    /// Bytes per second
    pub average_rate: f64,
    pub files_per_second: f64,
}

impl JobSummary {
    /// Summary of a job that had nothing to do
    pub fn empty(operation: Operation) -> Self {
        Self::compute(operation, 0, 0, 0, 0, Duration::ZERO)
    }

    fn compute(
        operation: Operation,
        total_files: u64,
        total_bytes: u64,
        failures: u64,
        skipped: u64,
        elapsed: Duration,
    ) -> Self {
        let duration_seconds = elapsed.as_secs_f64();
        let per_second = |value: u64| {
            if duration_seconds > 0.0 {
                value as f64 / duration_seconds
            } else {
                0.0
            }
        };

        Self {
            operation,
            total_files,
            total_bytes,
            duration_seconds,
            failures,
            skipped,
            average_rate: per_second(total_bytes),
            files_per_second: per_second(total_files),
        }
    }
}

/// Streaming fold over transfer outcomes
#[derive(Debug)]
pub struct OutcomeAggregator {
    operation: Operation,
    started: Instant,
    success: bool,
    total_items: u64,
    total_bytes: u64,
    failures: u64,
    skipped: u64,
}

impl OutcomeAggregator {
    /// Start the clock
    pub fn start(operation: Operation) -> Self {
        Self {
            operation,
            started: Instant::now(),
            success: true,
            total_items: 0,
            total_bytes: 0,
            failures: 0,
            skipped: 0,
        }
    }

    pub fn record(&mut self, outcome: &TransferOutcome) {
        self.total_items += 1;
        if outcome.is_success() {
            self.total_bytes += outcome.bytes_transferred;
            if outcome.is_skipped() {
                self.skipped += 1;
            }
        } else {
            self.success = false;
            self.failures += 1;
        }
    }

    /// AND of every outcome recorded so far
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn items(&self) -> u64 {
        self.total_items
    }

    pub fn finish(self) -> JobSummary {
        JobSummary::compute(
            self.operation,
            self.total_items,
            self.total_bytes,
            self.failures,
            self.skipped,
            self.started.elapsed(),
        )
    }
}
