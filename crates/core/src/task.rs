//! Transfer tasks and their outcomes

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// One side of a transfer: a local path or a remote key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Local(PathBuf),
    Remote(String),
}

impl Identifier {
    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Identifier::Local(path) => Some(path),
            Identifier::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Identifier::Remote(key) => Some(key),
            Identifier::Local(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Local(path) => write!(f, "{}", path.display()),
            Identifier::Remote(key) => f.write_str(key),
        }
    }
}

/// Direction of a single-item transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Local file to remote key
    Put,
    /// Remote key to local file
    Get,
}

/// A single unit of work, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub source: Identifier,
    pub destination: Identifier,
    /// Expected byte count: local file size for uploads, listed size otherwise
    pub size_hint: Option<u64>,
}

impl TransferTask {
    pub fn upload(path: impl Into<PathBuf>, key: impl Into<String>, size_hint: Option<u64>) -> Self {
        Self {
            source: Identifier::Local(path.into()),
            destination: Identifier::Remote(key.into()),
            size_hint,
        }
    }

    pub fn download(key: impl Into<String>, path: impl Into<PathBuf>, size_hint: Option<u64>) -> Self {
        Self {
            source: Identifier::Remote(key.into()),
            destination: Identifier::Local(path.into()),
            size_hint,
        }
    }

    /// Removal of a remote key; source and destination both name the key
    pub fn delete(key: impl Into<String>, size_hint: Option<u64>) -> Self {
        let key = key.into();
        Self {
            source: Identifier::Remote(key.clone()),
            destination: Identifier::Remote(key),
            size_hint,
        }
    }
}

impl fmt::Display for TransferTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source == self.destination {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{} -> {}", self.source, self.destination)
        }
    }
}

/// Result of one task
#[derive(Debug)]
pub enum TransferStatus {
    Success,
    /// Download target already present and overwrite not requested
    Skipped,
    Failed(Error),
}

/// Exactly one outcome is produced per submitted task
#[derive(Debug)]
pub struct TransferOutcome {
    pub task: TransferTask,
    pub status: TransferStatus,
    /// Bytes moved; always 0 for skipped and failed items
    pub bytes_transferred: u64,
}

impl TransferOutcome {
    pub fn succeeded(task: TransferTask, bytes_transferred: u64) -> Self {
        Self {
            task,
            status: TransferStatus::Success,
            bytes_transferred,
        }
    }

    pub fn skipped(task: TransferTask) -> Self {
        Self {
            task,
            status: TransferStatus::Skipped,
            bytes_transferred: 0,
        }
    }

    /// `error` must be item-scoped
    pub fn failed(task: TransferTask, error: Error) -> Self {
        debug_assert!(!error.is_fatal(), "fatal error in item outcome: {error}");
        Self {
            task,
            status: TransferStatus::Failed(error),
            bytes_transferred: 0,
        }
    }

    /// Skipped items count as successes
    pub fn is_success(&self) -> bool {
        !matches!(self.status, TransferStatus::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, TransferStatus::Skipped)
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.status {
            TransferStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}
