//! ObjectStore trait definition
//!
//! The capability surface the transfer engine needs from a remote store:
//! paged listing, whole-object get/put, file streaming and bulk delete.
//! Keeping it SDK-independent lets the engine run against an in-memory
//! store in tests.

use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::error::{Error, Result};
use crate::path::RemotePath;

/// Metadata for an object or a common prefix returned by a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Full key within the bucket
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: Option<Timestamp>,
    pub etag: Option<String>,
    /// Common prefix returned by a delimiter listing
    pub is_dir: bool,
}

impl ObjectInfo {
    pub fn file(key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            last_modified: None,
            etag: None,
            is_dir: false,
        }
    }

    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: 0,
            last_modified: None,
            etag: None,
            is_dir: true,
        }
    }
}

/// Options for a single listing request
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Return the whole subtree instead of grouping by delimiter
    pub recursive: bool,
    /// Delimiter for non-recursive listings (defaults to `/`)
    pub delimiter: Option<String>,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

/// One page of listing results
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub items: Vec<ObjectInfo>,
    pub truncated: bool,
    pub continuation_token: Option<String>,
}

/// A key the store refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub code: String,
    pub message: String,
}

/// Per-key result of one bulk-delete request.
///
/// Only failures are reported; every other key in the request was deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub failures: Vec<DeleteFailure>,
}

/// Remote store operations used by the transfer engine
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of objects under `path.key`
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;

    /// Fetch a whole object into memory
    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>>;

    /// Store a whole object, replacing any existing one
    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ObjectInfo>;

    /// Delete up to 1000 keys in one request.
    ///
    /// `Err` means the request as a whole failed and no key is known to be
    /// deleted.
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteReport>;

    /// Upload a local file, returning the number of bytes sent
    async fn upload_file(
        &self,
        path: &RemotePath,
        source: &Path,
        content_type: Option<String>,
    ) -> Result<u64> {
        let data = tokio::fs::read(source).await?;
        let size = data.len() as u64;
        self.put_object(path, data, content_type).await?;
        Ok(size)
    }

    /// Download an object into a local file, returning the number of bytes written
    async fn download_file(&self, path: &RemotePath, destination: &Path) -> Result<u64> {
        let data = self.get_object(path).await?;
        let size = data.len() as u64;
        tokio::fs::write(destination, data).await?;
        Ok(size)
    }
}

/// Store for jobs that never issue a request, such as a dry-run upload.
///
/// Every operation fails, so no client (and no credential or region
/// lookup) is needed to run them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineStore;

impl OfflineStore {
    fn unavailable(operation: &str, target: impl std::fmt::Display) -> Error {
        Error::General(format!("{operation} {target}: no object store in offline mode"))
    }
}

#[async_trait]
impl ObjectStore for OfflineStore {
    async fn list_objects(&self, path: &RemotePath, _options: ListOptions) -> Result<ListResult> {
        Err(Self::unavailable("list", path))
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        Err(Self::unavailable("get", path))
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        _data: Vec<u8>,
        _content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        Err(Self::unavailable("put", path))
    }

    async fn delete_objects(&self, bucket: &str, _keys: Vec<String>) -> Result<DeleteReport> {
        Err(Self::unavailable("delete in", bucket))
    }
}
