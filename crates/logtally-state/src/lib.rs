//! Durable file-pointer state
//!
//! Maps each logical log path to the physical file, byte offset and creation
//! timestamp it was last read at. Loaded once at startup, updated after each
//! processing pass, and written back as pretty JSON. Pointer state is
//! best-effort: losing it only means already-seen lines may be reprocessed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, error, info};

use logtally_types::FilePointer;

/// Errors surfaced when writing the pointer file
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to serialize pointer state")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write pointer file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared map from logical log path to its last-known read state
///
/// Cheap to clone; all clones share one underlying map. Concurrent passes for
/// different logical logs only contend on the map lock itself.
#[derive(Clone)]
pub struct PointerStore {
    pointers: Arc<RwLock<HashMap<String, FilePointer>>>,
    // Serializes writers of the backing file; passes finish concurrently.
    persist_lock: Arc<Mutex<()>>,
    path: PathBuf,
}

impl PointerStore {
    /// Load pointer state from `path`
    ///
    /// A missing file is a first run and yields an empty store. A malformed
    /// file is logged and also yields an empty store: state recency is
    /// best-effort, never fatal.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pointers = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, FilePointer>>(&content) {
                Ok(map) => {
                    info!(
                        "loaded {} file pointer(s) from {}",
                        map.len(),
                        path.display()
                    );
                    map
                }
                Err(err) => {
                    error!(
                        "pointer file {} is malformed, starting empty: {err}",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!("pointer file {} not found, starting empty", path.display());
                HashMap::new()
            }
        };

        Self {
            pointers: Arc::new(RwLock::new(pointers)),
            persist_lock: Arc::new(Mutex::new(())),
            path,
        }
    }

    /// Get the pointer for a logical path, creating a fresh zero-offset
    /// pointer bound to `physical_path` if none is registered yet
    ///
    /// Concurrent first lookups for the same logical path converge on a
    /// single stored instance.
    pub fn get_or_insert(&self, logical_path: &str, physical_path: &str) -> FilePointer {
        let mut pointers = self.pointers.write();
        pointers
            .entry(logical_path.to_string())
            .or_insert_with(|| FilePointer::new(physical_path))
            .clone()
    }

    /// Overwrite the stored pointer for a logical path
    pub fn update(
        &self,
        logical_path: &str,
        filename: &str,
        last_read_position: u64,
        file_creation_time: i64,
    ) {
        let mut pointers = self.pointers.write();
        pointers.insert(
            logical_path.to_string(),
            FilePointer {
                filename: filename.to_string(),
                last_read_position,
                file_creation_time,
            },
        );
    }

    /// Look up the pointer for a logical path without creating one
    pub fn get(&self, logical_path: &str) -> Option<FilePointer> {
        self.pointers.read().get(logical_path).cloned()
    }

    /// Number of registered logical paths
    pub fn len(&self) -> usize {
        self.pointers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.read().is_empty()
    }

    /// Write the full map to the backing file
    ///
    /// The serialized state goes to a temp sibling first and is renamed over
    /// the target, so a failed write leaves the previous file intact.
    pub fn persist(&self) -> Result<(), PersistError> {
        let _guard = self.persist_lock.lock();
        let snapshot = self.pointers.read().clone();
        let content = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| PersistError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| PersistError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "persisted {} file pointer(s) to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Like [`persist`](Self::persist), but logs failures instead of
    /// returning them; a pass never fails because pointer state could not be
    /// saved
    pub fn persist_logged(&self) {
        if let Err(err) = self.persist() {
            error!(
                "failed to save file pointers to {}: {err}",
                self.path.display()
            );
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PointerStore::load(dir.path().join("filepointer.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepointer.json");
        fs::write(&path, "{not json").unwrap();

        let store = PointerStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_or_insert_creates_zero_offset_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = PointerStore::load(dir.path().join("filepointer.json"));

        let pointer = store.get_or_insert("/logs/app-*.log", "/logs/app-1.log");
        assert_eq!(pointer.filename, "/logs/app-1.log");
        assert_eq!(pointer.last_read_position, 0);
        assert_eq!(pointer.file_creation_time, 0);

        // A second lookup returns the registered instance, not a new one
        let again = store.get_or_insert("/logs/app-*.log", "/logs/app-2.log");
        assert_eq!(again.filename, "/logs/app-1.log");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_overwrites_stored_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = PointerStore::load(dir.path().join("filepointer.json"));

        store.get_or_insert("/logs/app-*.log", "/logs/app-1.log");
        store.update("/logs/app-*.log", "/logs/app-2.log", 4096, 1_700_000_000_000);

        let pointer = store.get("/logs/app-*.log").unwrap();
        assert_eq!(pointer.filename, "/logs/app-2.log");
        assert_eq!(pointer.last_read_position, 4096);
        assert_eq!(pointer.file_creation_time, 1_700_000_000_000);
    }

    #[test]
    fn test_persist_then_load_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepointer.json");

        let store = PointerStore::load(&path);
        store.update("/logs/app-*.log", "/logs/app-3.log", 123, 1_700_000_000_111);
        store.update("/logs/sys-*.log", "/logs/sys-1.log", 0, 1_700_000_000_222);
        store.persist().unwrap();

        let reloaded = PointerStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("/logs/app-*.log").unwrap(),
            FilePointer {
                filename: "/logs/app-3.log".to_string(),
                last_read_position: 123,
                file_creation_time: 1_700_000_000_111,
            }
        );
        assert_eq!(
            reloaded.get("/logs/sys-*.log").unwrap(),
            FilePointer {
                filename: "/logs/sys-1.log".to_string(),
                last_read_position: 0,
                file_creation_time: 1_700_000_000_222,
            }
        );
    }

    #[test]
    fn test_persist_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepointer.json");

        let store = PointerStore::load(&path);
        store.update("/logs/app-*.log", "/logs/app-1.log", 10, 1);
        store.persist().unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
