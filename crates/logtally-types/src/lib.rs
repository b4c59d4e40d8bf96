//! Shared types for logtally
//!
//! This crate contains data structures used across multiple logtally crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Separator between segments of a hierarchical metric name
pub const METRIC_SEPARATOR: &str = "|";

/// Segment grouping all per-pattern metrics of a log
pub const SEARCH_STRING: &str = "Search String";

/// Leaf segment for per-pattern occurrence counters
pub const OCCURRENCES: &str = "Occurrences";

/// Segment for per-literal match breakdowns
pub const MATCHES: &str = "Matches";

/// Metric name reporting the scanned file's byte length
pub const FILESIZE_METRIC_NAME: &str = "File size (Bytes)";

/// Metric prefix used when the configuration does not override it
pub const DEFAULT_METRIC_PREFIX: &str = "Custom Metrics|Log Monitor";

/// Default name of the persisted pointer file
pub const POINTER_FILENAME: &str = "filepointer.json";

// ============================================================================
// Configuration Types
// ============================================================================

/// One configured search pattern within a logical log
#[derive(Clone, Debug)]
pub struct SearchSpec {
    /// Name used in metric paths
    pub display_name: String,

    /// Raw pattern text; a literal token or a regular expression
    pub pattern: String,

    /// Require matches bounded by whitespace or line start/end
    pub match_whole_token: bool,

    /// Match with exact case instead of case-insensitively
    pub case_sensitive: bool,

    /// Also count each distinct matched literal under a Matches breakdown
    pub capture_matches: bool,
}

/// A monitored logical log: a directory plus a wildcard filename pattern
///
/// The logical log stays the same while the physical file backing it is
/// rotated or renamed. Immutable once loaded for a run.
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Name used in metric paths and event records
    pub display_name: String,

    /// Directory holding the physical files
    pub directory: PathBuf,

    /// Wildcard filename pattern (`*` and `?`)
    pub filename_pattern: String,

    /// Optional source encoding label; files are converted to UTF-8 first
    pub encoding: Option<String>,

    /// Configured search patterns, in configuration order
    pub search: Vec<SearchSpec>,
}

impl LogConfig {
    /// Stable identity for pointer bookkeeping, independent of rotation
    pub fn logical_path(&self) -> String {
        self.directory.join(&self.filename_pattern).display().to_string()
    }

    /// Metric segment for this log, falling back to the filename pattern
    pub fn metric_label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.filename_pattern
        } else {
            &self.display_name
        }
    }
}

// ============================================================================
// Pointer Types
// ============================================================================

/// Last-known read state for one logical log
///
/// Persisted as JSON keyed by the logical path, so a later run can resume
/// from the exact byte where the previous one stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePointer {
    /// Physical file last associated with the logical log
    pub filename: String,

    /// Byte offset immediately after the last line read
    pub last_read_position: u64,

    /// Creation timestamp of the physical file, epoch millis
    pub file_creation_time: i64,
}

impl FilePointer {
    /// Fresh pointer at offset zero, bound to the given physical file
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            last_read_position: 0,
            file_creation_time: 0,
        }
    }

    /// Whether this pointer still refers to the given physical file
    pub fn refers_to(&self, path: &Path) -> bool {
        Path::new(&self.filename) == path
    }
}

// ============================================================================
// Published Output Types
// ============================================================================

/// One published metric: a pipe-delimited name and a string-encoded value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metric {
    /// Hierarchical name below the prefix, e.g. `AppLog|Search String|Error|Occurrences`
    pub name: String,

    /// String-encoded integer value
    pub value: String,

    /// Fully-qualified path including the configured prefix
    pub path: String,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: impl Into<String>, prefix: &str) -> Self {
        let name = name.into();
        let path = format!("{}{}{}", prefix, METRIC_SEPARATOR, name);
        Self {
            name,
            value: value.into(),
            path,
        }
    }
}

/// One captured match, handed to the events sink
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    /// Display name of the logical log the match came from
    pub log_display_name: String,

    /// Raw pattern text that matched
    pub search_pattern: String,

    /// Display name of the pattern that matched
    pub search_pattern_display_name: String,

    /// Matched line plus any trailing context lines, newline-terminated
    pub log_match: String,
}
