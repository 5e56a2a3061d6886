//! Output handling
//!
//! Human-readable and JSON rendering plus the progress display.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::ConsoleSink;

/// Output mode switches shared by every command
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Print strict JSON without colors or progress
    pub json: bool,
    pub no_color: bool,
    /// Suppress progress and non-error output
    pub quiet: bool,
}
