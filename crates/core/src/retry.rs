//! Retry with exponential backoff and jitter
//!
//! Wraps per-item store calls so transient failures (timeouts, throttling,
//! connection resets) are retried before an item is recorded as failed.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// `what` names the item in debug logs.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    what: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retryable_error(&e) => {
                let backoff = backoff_for(config, attempt);
                tracing::debug!(
                    item = what,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Backoff before the retry following `attempt` (1-based): the capped
/// exponential delay plus up to the same amount of jitter.
fn backoff_for(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base_ms = config.initial_backoff_ms.saturating_mul(1u64 << exponent);
    let capped_ms = base_ms.min(config.max_backoff_ms);
    Duration::from_millis(capped_ms + jitter(capped_ms))
}

/// Pseudo-random value in `0..max` taken from the clock's sub-second nanos
fn jitter(max: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % max.max(1)
}

/// Whether an error is transient and worth another attempt
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Network(msg) | Error::General(msg) => {
            let msg = msg.to_lowercase();
            [
                "timeout",
                "timed out",
                "connection reset",
                "connection refused",
                "broken pipe",
                "dispatch",
                "503",
                "service unavailable",
                "429",
                "too many requests",
                "slow down",
                "slowdown",
                "internalerror",
                "internal error",
            ]
            .iter()
            .any(|pattern| msg.contains(pattern))
        }
        Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
        ),
        _ => false,
    }
}
