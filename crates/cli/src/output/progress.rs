//! Console report sink
//!
//! Renders engine events as two indicatif bars: task submission and the
//! transfer itself. Item failures are printed above the bars.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use humansize::{BINARY, format_size};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use xfer_core::{JobState, Operation, ReportSink, TransferOutcome};

use super::Formatter;

const SUBMIT_TEMPLATE: &str = "{prefix:>10} [{bar:40.cyan/blue}] {pos}/{len}";
const TRANSFER_TEMPLATE: &str =
    "{prefix:>10} {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}";

struct Bars {
    multi: MultiProgress,
    submit: ProgressBar,
    transfer: ProgressBar,
}

pub struct ConsoleSink {
    formatter: Formatter,
    bars: OnceLock<Bars>,
    bytes: AtomicU64,
}

impl ConsoleSink {
    pub fn new(formatter: Formatter) -> Self {
        Self {
            formatter,
            bars: OnceLock::new(),
            bytes: AtomicU64::new(0),
        }
    }

    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }

    /// Print without tearing the bars
    fn print_error(&self, message: &str) {
        match self.bars.get() {
            Some(bars) => bars.multi.suspend(|| self.formatter.error(message)),
            None => self.formatter.error(message),
        }
    }
}

impl ReportSink for ConsoleSink {
    fn state_changed(&self, state: JobState) {
        let Some(bars) = self.bars.get() else {
            return;
        };
        match state {
            JobState::Reporting => {
                bars.submit.finish_and_clear();
                bars.transfer.finish();
            }
            JobState::Failed => {
                bars.submit.abandon();
                bars.transfer.abandon();
            }
            _ => {}
        }
    }

    fn job_started(&self, operation: Operation, items: usize, _total_bytes: u64, _dry_run: bool) {
        if !self.formatter.shows_progress() {
            return;
        }

        let multi = MultiProgress::new();
        let submit = multi.add(ProgressBar::new(items as u64));
        submit.set_style(Self::style(SUBMIT_TEMPLATE));
        submit.set_prefix("Submitting");

        let transfer = multi.add(ProgressBar::new(items as u64));
        transfer.set_style(Self::style(TRANSFER_TEMPLATE));
        transfer.set_prefix(operation.label());

        let _ = self.bars.set(Bars {
            multi,
            submit,
            transfer,
        });
    }

    fn batch_submitted(&self, tasks: usize) {
        if let Some(bars) = self.bars.get() {
            bars.submit.inc(tasks as u64);
        }
    }

    fn item_finished(&self, outcome: &TransferOutcome) {
        let bytes = self
            .bytes
            .fetch_add(outcome.bytes_transferred, Ordering::Relaxed)
            + outcome.bytes_transferred;

        if let Some(error) = outcome.error() {
            self.print_error(&error.to_string());
        }

        if let Some(bars) = self.bars.get() {
            bars.transfer.set_message(format_size(bytes, BINARY));
            bars.transfer.inc(1);
        }
    }
}
