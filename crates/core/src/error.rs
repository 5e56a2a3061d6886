//! Error types for xfer-core
//!
//! The taxonomy separates fatal errors, which abort a job before or outside
//! the transfer phase, from item-scoped errors, which are recorded against a
//! single task and never stop sibling tasks.

use thiserror::Error;

/// Result type alias for xfer-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for xfer-core operations
#[derive(Debug, Error)]
pub enum Error {
    /// Enumeration root does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// A path or key cannot be mapped onto the other side
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// A single upload or download failed
    #[error("Transfer failed for {item}: {reason}")]
    ItemTransferFailed { item: String, reason: String },

    /// A key could not be deleted, either alone or with its whole batch
    #[error("Delete failed for {key}: {reason}")]
    BatchDeleteFailed { key: String, reason: String },

    /// Missing or contradictory inputs
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed remote location
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration file could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials rejected by the store
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Bucket or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure talking to the store
    #[error("Network error: {0}")]
    Network(String),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an item-level cause for a transfer outcome
    pub fn item_failed(item: impl Into<String>, cause: &Error) -> Self {
        Error::ItemTransferFailed {
            item: item.into(),
            reason: cause.to_string(),
        }
    }

    /// Wrap a delete cause for one key
    pub fn delete_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::BatchDeleteFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole job.
    ///
    /// Item-scoped kinds are recovered at the item boundary. Everything else
    /// reaching the job driver ends the job in the `Failed` state.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ItemTransferFailed { .. } | Error::BatchDeleteFailed { .. }
        )
    }

    /// Whether this error stems from bad user input rather than runtime failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidPath(_) | Error::Config(_)
        )
    }
}
