//! Object key helpers
//!
//! The backend has no real directories: a "folder" is a key prefix ending
//! in `/`. These helpers derive names and prefixes from plain key strings.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// File name offered to a client's save dialog: the last non-empty segment
pub fn file_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Listing prefix for a folder name (`dir` -> `dir/`)
pub fn folder_prefix(dir: &str) -> String {
    format!("{dir}/")
}

/// Base name of the archive produced for a folder or whole-bucket download
pub fn archive_stem<'a>(dir: Option<&'a str>, bucket: &'a str) -> &'a str {
    match dir.map(file_name) {
        Some(name) if !name.is_empty() => name,
        _ => bucket,
    }
}

/// Destination key for `key` when folder `old` is renamed to `new`.
///
/// Every occurrence of `old` is substituted, not only the leading one, so a
/// folder name that recurs deeper in the key is rewritten there too.
pub fn renamed_key(key: &str, old: &str, new: &str) -> String {
    key.replace(old, new)
}

/// Local relative path for `key` once the source `prefix` is stripped.
///
/// Returns `None` for the prefix marker itself. Keys that would escape the
/// destination directory are rejected.
pub fn relative_key(key: &str, prefix: &str) -> Result<Option<PathBuf>> {
    let rest = key.strip_prefix(prefix).unwrap_or(key);
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return Ok(None);
    }

    let path = Path::new(rest);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidKey(format!(
                    "'{key}' cannot be placed inside a local directory"
                )));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(out))
}
