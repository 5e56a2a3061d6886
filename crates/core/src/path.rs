//! Location parsing
//!
//! A location is either a local filesystem path or a remote object-store
//! location written as `s3://bucket/prefix`.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// URI scheme identifying the remote store
pub const REMOTE_SCHEME: &str = "s3://";

/// A bucket plus a key (or key prefix) inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    pub bucket: String,
    pub key: String,
}

impl RemotePath {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Address another key in the same bucket
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(&self.bucket, key)
    }

    /// Key treated as a logical directory, without surrounding slashes
    pub fn prefix(&self) -> &str {
        self.key.trim_matches('/')
    }

    /// Prefix to send to the store when listing the logical directory.
    ///
    /// Empty for the bucket root, otherwise the prefix with one trailing
    /// separator so that sibling prefixes (`data2/` for `data`) are excluded.
    pub fn listing_prefix(&self) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{REMOTE_SCHEME}{}", self.bucket)
        } else {
            write!(f, "{REMOTE_SCHEME}{}/{}", self.bucket, self.key)
        }
    }
}

/// A parsed command-line location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    Local(PathBuf),
    Remote(RemotePath),
}

/// Parse a location string into a local path or a remote location
pub fn parse_path(location: &str) -> Result<ParsedPath> {
    if location.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".to_string()));
    }

    let Some(rest) = location.strip_prefix(REMOTE_SCHEME) else {
        return Ok(ParsedPath::Local(PathBuf::from(location)));
    };

    let (bucket, key) = match rest.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (rest, ""),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Bucket name is required: '{location}' (expected {REMOTE_SCHEME}bucket/prefix)"
        )));
    }

    Ok(ParsedPath::Remote(RemotePath::new(
        bucket,
        key.trim_end_matches('/'),
    )))
}
