//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output across the transfer and validate commands.

use console::Style;
use humansize::{BINARY, format_size};
use serde::Serialize;
use xfer_core::JobReport;

use super::OutputConfig;

/// Color theme for styled output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Summary labels - cyan
    pub key: Style,
    /// Headings and bucket names - bold
    pub name: Style,
    /// Success messages - green
    pub success: Style,
    /// Error messages - red
    pub error: Style,
    /// Warning messages - yellow
    pub warning: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            key: Style::new().cyan(),
            name: Style::new().bold(),
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
        }
    }
}

impl Theme {
    /// Returns a theme with no styling (for no-color mode)
    pub fn plain() -> Self {
        Self {
            key: Style::new(),
            name: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
        }
    }
}

/// Formatter for CLI output
///
/// Handles both human-readable and JSON output formats based on configuration.
/// When JSON mode is enabled, all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::default()
        };
        Self { config, theme }
    }

    /// Check if JSON output mode is enabled
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Progress bars are drawn only for interactive human output
    pub fn shows_progress(&self) -> bool {
        !self.config.quiet && !self.config.json
    }

    // ========== Style helper methods ==========

    /// Style a summary label (cyan)
    pub fn style_key(&self, text: &str) -> String {
        self.theme.key.apply_to(text).to_string()
    }

    /// Style a heading (bold)
    pub fn style_name(&self, text: &str) -> String {
        self.theme.name.apply_to(text).to_string()
    }

    // ========== Output methods ==========

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let checkmark = self.theme.success.apply_to("✓");
        println!("{checkmark} {message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            eprintln!("{cross} {message}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let warn_icon = self.theme.warning.apply_to("⚠");
        eprintln!("{warn_icon} {message}");
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print the job result: one JSON object, or the summary block
    pub fn report(&self, report: &JobReport) {
        if self.config.json {
            self.json(report);
            return;
        }
        if self.config.quiet {
            return;
        }

        let summary = &report.summary;
        let mut heading = format!("{} Summary", summary.operation.label());
        if report.dry_run {
            heading.push_str(" (dry run)");
        }

        println!();
        println!("{}", self.style_name(&heading));
        for (label, value) in summary_rows(report) {
            let label = format!("{label:<14}");
            println!("  {} {value}", self.style_key(&label));
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

/// Label/value pairs of the human summary block
fn summary_rows(report: &JobReport) -> Vec<(&'static str, String)> {
    let summary = &report.summary;
    vec![
        ("Total files:", summary.total_files.to_string()),
        ("Total size:", format_size(summary.total_bytes, BINARY)),
        ("Duration:", format!("{:.2}s", summary.duration_seconds)),
        (
            "Average rate:",
            format!("{}/s", format_size(summary.average_rate as u64, BINARY)),
        ),
        ("Files/second:", format!("{:.2}", summary.files_per_second)),
        ("Failures:", summary.failures.to_string()),
        ("Skipped:", summary.skipped.to_string()),
    ]
}
