//! Candidate enumeration
//!
//! Produces the full item set for a job before any transfer starts: a local
//! directory walk or a drained remote prefix listing, both filtered by a
//! shell-style pattern on the basename.

use std::path::{Path, PathBuf};

use jiff::Timestamp;
use walkdir::WalkDir;

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::keymap::{self, SEPARATOR};
use crate::path::RemotePath;
use crate::retry::retry_with_backoff;
use crate::traits::{ListOptions, ObjectStore};

/// Page size requested from the store
const LIST_PAGE_SIZE: i32 = 1000;

/// Optional glob pattern matched against basenames only
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pattern: Option<glob::Pattern>,
}

impl Filter {
    /// Accept every name
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile a pattern such as `*.png`; `None` accepts everything
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| Error::Validation(format!("Invalid filter pattern '{p}': {e}")))
            })
            .transpose()?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().is_none_or(|p| p.matches(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.pattern.as_ref().map(|p| p.as_str())
    }
}

/// A local file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    /// Path relative to the listing base, `/`-separated
    pub relative_key: String,
    pub size: u64,
}

/// Result of a local walk
#[derive(Debug, Clone)]
pub struct LocalListing {
    /// Directory every entry is relative to: the root itself, or its
    /// parent when the root is a single file
    pub base: PathBuf,
    pub entries: Vec<LocalEntry>,
}

/// An object selected from a remote listing
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<Timestamp>,
}

/// Walk `root` and return the regular files it selects.
///
/// A file root yields itself. A directory root yields its direct files, or
/// every descendant file when `recursive` is set. Directories are never
/// yielded. Symlinks are followed so linked files are uploaded as files.
pub fn enumerate_local(root: &Path, recursive: bool, filter: &Filter) -> Result<LocalListing> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::SourceNotFound(format!("Source path does not exist: {}", root.display()))
        }
        _ => Error::Io(e),
    })?;

    if metadata.is_file() {
        let base = root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut entries = Vec::new();
        let relative_key = keymap::local_to_remote_key(&base, root, "")?;
        if filter.matches(keymap::basename(&relative_key)) {
            entries.push(LocalEntry {
                path: root.to_path_buf(),
                relative_key,
                size: metadata.len(),
            });
        }
        return Ok(LocalListing { base, entries });
    }

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut entries = Vec::new();
    for next in walker {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::Io(err.into()));
            }
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !filter.matches(&name) {
            continue;
        }

        let size = entry.metadata().map_err(|e| Error::Io(e.into()))?.len();
        let relative_key = keymap::local_to_remote_key(root, entry.path(), "")?;
        entries.push(LocalEntry {
            path: entry.into_path(),
            relative_key,
            size,
        });
    }

    tracing::debug!(root = %root.display(), count = entries.len(), recursive, "Enumerated local files");

    Ok(LocalListing {
        base: root.to_path_buf(),
        entries,
    })
}

/// List every object under `location`, draining all pages.
///
/// Non-recursive listings use the `/` delimiter and keep only direct
/// children. Folder markers (keys ending in `/`) are excluded.
pub async fn enumerate_remote(
    store: &dyn ObjectStore,
    location: &RemotePath,
    recursive: bool,
    filter: &Filter,
    retry: &RetryConfig,
) -> Result<Vec<RemoteObjectEntry>> {
    let listing_prefix = location.listing_prefix();
    let listing_path = location.with_key(listing_prefix.clone());

    let mut entries = Vec::new();
    let mut continuation_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let options = ListOptions {
            recursive,
            delimiter: (!recursive).then(|| SEPARATOR.to_string()),
            max_keys: Some(LIST_PAGE_SIZE),
            continuation_token: continuation_token.clone(),
        };

        let page = retry_with_backoff(retry, &listing_path.to_string(), || {
            store.list_objects(&listing_path, options.clone())
        })
        .await?;
        pages += 1;

        for item in page.items {
            if item.is_dir {
                tracing::debug!(prefix = %item.key, "Found directory");
                continue;
            }
            if item.key.ends_with(SEPARATOR) {
                continue;
            }

            let relative = item.key.strip_prefix(&listing_prefix).unwrap_or(&item.key);
            if !recursive && relative.contains(SEPARATOR) {
                continue;
            }
            if !filter.matches(keymap::basename(&item.key)) {
                continue;
            }

            entries.push(RemoteObjectEntry {
                key: item.key,
                size: item.size_bytes,
                last_modified: item.last_modified,
            });
        }

        match (page.truncated, page.continuation_token) {
            (true, Some(token)) => continuation_token = Some(token),
            (true, None) => {
                tracing::warn!(location = %location, "Listing truncated without continuation token");
                break;
            }
            (false, _) => break,
        }
    }

    tracing::debug!(location = %location, pages, count = entries.len(), recursive, "Enumerated remote objects");

    Ok(entries)
}
