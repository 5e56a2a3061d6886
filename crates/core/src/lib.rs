//! xfer-core: transfer engine for the xfer bulk S3 transfer tool
//!
//! This crate provides everything between the command line and the wire:
//! - Configuration management
//! - Remote location parsing and key mapping
//! - Local and remote enumeration with glob filtering
//! - A bounded-concurrency transfer executor and a batch delete coordinator
//! - Outcome aggregation and the job driver state machine
//!
//! The engine only talks to storage through the [`ObjectStore`] trait, so it
//! is independent of any specific S3 SDK and can be tested against an
//! in-memory store.

pub mod aggregate;
pub mod config;
pub mod delete;
pub mod enumerate;
pub mod error;
pub mod executor;
pub mod job;
pub mod keymap;
pub mod path;
pub mod report;
pub mod retry;
pub mod task;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use aggregate::{JobSummary, Operation, OutcomeAggregator};
pub use config::{Config, ConfigManager, RetryConfig, StoreConfig, TransferConfig};
pub use delete::BatchDeleter;
pub use enumerate::{Filter, LocalEntry, LocalListing, RemoteObjectEntry, enumerate_local, enumerate_remote};
pub use error::{Error, Result};
pub use executor::{ExecutorOptions, TransferEvent, TransferExecutor};
pub use job::{Job, JobMode, JobOptions, JobReport, JobState, Plan};
pub use keymap::{local_to_remote_key, remote_key_to_local_path};
pub use path::{ParsedPath, RemotePath, parse_path};
pub use report::{NullSink, ReportSink};
pub use retry::{is_retryable_error, retry_with_backoff};
pub use task::{Identifier, TransferKind, TransferOutcome, TransferStatus, TransferTask};
pub use traits::{
    DeleteFailure, DeleteReport, ListOptions, ListResult, ObjectInfo, ObjectStore, OfflineStore,
};
