//! Process exit codes

/// Exit status of the `xfer` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Every item succeeded (skipped downloads included)
    Success = 0,
    /// Item failures, a fatal job error, or invalid input
    Failure = 1,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            ExitCode::Success
        } else {
            ExitCode::Failure
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}
