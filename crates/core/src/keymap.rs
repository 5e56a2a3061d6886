//! Key mapping between local paths and remote keys
//!
//! Remote keys always use `/` separators and never start with one,
//! whatever the host path separator is.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Remote key separator
pub const SEPARATOR: char = '/';

/// Map `file` (under `base`) to its key under `prefix`.
///
/// Fails with `InvalidMapping` when `file` is not strictly inside `base`.
pub fn local_to_remote_key(base: &Path, file: &Path, prefix: &str) -> Result<String> {
    let relative = file.strip_prefix(base).map_err(|_| {
        Error::InvalidMapping(format!(
            "{} is not under {}",
            file.display(),
            base.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidMapping(format!(
                    "{} escapes {}",
                    file.display(),
                    base.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidMapping(format!(
            "{} has no path relative to {}",
            file.display(),
            base.display()
        )));
    }

    let relative_key = segments.join("/");
    let prefix = prefix.trim_matches(SEPARATOR);
    if prefix.is_empty() {
        Ok(relative_key)
    } else {
        Ok(format!("{prefix}{SEPARATOR}{relative_key}"))
    }
}

/// Map a remote key to a path under `destination`, dropping `prefix`.
///
/// Exactly one separator following the prefix is removed. Keys whose
/// remainder is empty or contains `..` segments are rejected with
/// `InvalidMapping`, since they cannot land inside `destination`.
pub fn remote_key_to_local_path(key: &str, prefix: &str, destination: &Path) -> Result<PathBuf> {
    let prefix = prefix.trim_matches(SEPARATOR);
    let relative = match key.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() => rest.strip_prefix(SEPARATOR).unwrap_or(rest),
        _ => key,
    };

    let mut path = destination.to_path_buf();
    let mut pushed = false;
    for segment in relative.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(Error::InvalidMapping(format!(
                    "key '{key}' would escape {}",
                    destination.display()
                )));
            }
            part => {
                path.push(part);
                pushed = true;
            }
        }
    }

    if !pushed {
        return Err(Error::InvalidMapping(format!(
            "key '{key}' has no name below prefix '{prefix}'"
        )));
    }

    Ok(path)
}

/// Last path segment of a key or path string
pub fn basename(key: &str) -> &str {
    key.trim_end_matches(SEPARATOR)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or(key)
}
