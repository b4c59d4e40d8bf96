use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Errors mapping a logical log to physical files
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Fatal for this logical log's pass only, never for the whole run
    #[error("directory [{0}] not found, ensure it is a directory")]
    DirectoryNotFound(PathBuf),

    #[error("failed to list directory [{path}]")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid filename pattern '{0}'")]
    InvalidPattern(String),
}

/// Find the physical file currently backing the logical log: among all files
/// matching the wildcard pattern, the one with the greatest modified time
///
/// Returns `None` when nothing matches; the caller skips the pass with a
/// diagnostic.
pub fn resolve_active_file(dir: &Path, pattern: &str) -> Result<Option<PathBuf>, ResolveError> {
    let mut latest: Option<(PathBuf, SystemTime)> = None;
    for path in list_matching(dir, pattern)? {
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(err) => {
                warn!("skipping unreadable file {}: {err}", path.display());
                continue;
            }
        };
        if latest.as_ref().is_none_or(|(_, t)| modified > *t) {
            latest = Some((path, modified));
        }
    }
    Ok(latest.map(|(path, _)| path))
}

/// All files matching the pattern whose creation timestamp is at or after
/// the reference, i.e. every candidate that might hold unread data after a
/// rotation
pub fn files_created_since(
    dir: &Path,
    pattern: &str,
    reference_millis: i64,
) -> Result<Vec<PathBuf>, ResolveError> {
    let mut files = Vec::new();
    for path in list_matching(dir, pattern)? {
        match creation_time_millis(&path) {
            Ok(created) if created >= reference_millis => files.push(path),
            Ok(_) => {}
            Err(err) => warn!("skipping unreadable file {}: {err}", path.display()),
        }
    }
    files.sort();
    Ok(files)
}

/// Creation timestamp of a file in epoch millis
///
/// Falls back to the modified time on filesystems that do not report a
/// birth time.
pub fn creation_time_millis(path: &Path) -> io::Result<i64> {
    let metadata = fs::metadata(path)?;
    let time = metadata.created().or_else(|_| metadata.modified())?;
    Ok(DateTime::<Utc>::from(time).timestamp_millis())
}

fn list_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
    if !dir.is_dir() {
        return Err(ResolveError::DirectoryNotFound(dir.to_path_buf()));
    }

    let matcher = wildcard_regex(pattern)?;
    let entries = fs::read_dir(dir).map_err(|source| ResolveError::List {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ResolveError::List {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && matcher.is_match(name)
        {
            files.push(path);
        }
    }
    Ok(files)
}

/// Translate a `*`/`?` wildcard into an anchored regex over the whole
/// filename
fn wildcard_regex(pattern: &str) -> Result<Regex, ResolveError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            _ => source.push_str(&regex::escape(&c.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|_| ResolveError::InvalidPattern(pattern.to_string()))
}
