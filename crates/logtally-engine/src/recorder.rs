use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use logtally_types::{FilePointer, MatchEvent};

#[derive(Clone, Debug, Default)]
struct RecorderInner {
    occurrences: BTreeMap<String, u64>,
    matches: BTreeMap<String, BTreeMap<String, u64>>,
    file_sizes: HashMap<String, u64>,
    pointers: Vec<FilePointer>,
    events: Vec<MatchEvent>,
}

/// Thread-safe accumulator shared by all scanners of one pass
///
/// Cheap to clone; all clones write to the same underlying state. Scanners
/// of different physical files record concurrently without losing updates;
/// per-key increments are atomic under the lock.
#[derive(Clone, Default)]
pub struct PassRecorder {
    inner: Arc<Mutex<RecorderInner>>,
}

impl PassRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a pattern's occurrence counter present at zero, so a pattern
    /// that never matches still reports "0" rather than being absent
    pub fn ensure_pattern(&self, display_name: &str) {
        let mut inner = self.inner.lock();
        inner.occurrences.entry(display_name.to_string()).or_insert(0);
    }

    /// Count one occurrence of a pattern; never wraps
    pub fn record_occurrence(&self, display_name: &str) {
        let mut inner = self.inner.lock();
        let counter = inner.occurrences.entry(display_name.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
    }

    /// Count one occurrence of a distinct matched literal for a pattern
    pub fn record_match_text(&self, display_name: &str, literal: &str) {
        let mut inner = self.inner.lock();
        let counter = inner
            .matches
            .entry(display_name.to_string())
            .or_default()
            .entry(literal.to_string())
            .or_insert(0);
        *counter = counter.saturating_add(1);
    }

    /// Record the current byte length of a scanned file
    pub fn record_file_size(&self, filename: &str, len: u64) {
        self.inner.lock().file_sizes.insert(filename.to_string(), len);
    }

    /// Add one file's pointer candidate for the commit step
    pub fn push_pointer(&self, pointer: FilePointer) {
        self.inner.lock().pointers.push(pointer);
    }

    pub fn push_event(&self, event: MatchEvent) {
        self.inner.lock().events.push(event);
    }

    /// Snapshot the accumulated state; called once, after the completion
    /// barrier has released
    pub fn into_result(self) -> PassResult {
        let inner = self.inner.lock().clone();
        PassResult {
            occurrences: inner.occurrences,
            matches: inner.matches,
            file_sizes: inner.file_sizes,
            pointers: inner.pointers,
            events: inner.events,
        }
    }
}

/// Aggregated outcome of one pass over one logical log
#[derive(Clone, Debug, Default)]
pub struct PassResult {
    /// Per-pattern occurrence counters, in deterministic name order
    pub occurrences: BTreeMap<String, u64>,

    /// Per-pattern, per-literal-text match counters
    pub matches: BTreeMap<String, BTreeMap<String, u64>>,

    /// Byte length observed for each scanned file
    pub file_sizes: HashMap<String, u64>,

    /// One pointer candidate per successfully scanned file
    pub pointers: Vec<FilePointer>,

    /// Captured match events for the sink
    pub events: Vec<MatchEvent>,
}

impl PassResult {
    /// The candidate future passes must resume from: greatest creation
    /// timestamp, ties broken by lexicographically greatest filename
    pub fn winning_pointer(&self) -> Option<&FilePointer> {
        self.pointers
            .iter()
            .max_by_key(|p| (p.file_creation_time, &p.filename))
    }

    /// Byte-size observation belonging to the winning candidate's file
    pub fn winning_file_size(&self) -> Option<u64> {
        self.winning_pointer()
            .and_then(|p| self.file_sizes.get(&p.filename).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(filename: &str, creation: i64) -> FilePointer {
        FilePointer {
            filename: filename.to_string(),
            last_read_position: 10,
            file_creation_time: creation,
        }
    }

    #[test]
    fn test_ensure_pattern_reports_zero_not_absent() {
        let recorder = PassRecorder::new();
        recorder.ensure_pattern("Error");
        let result = recorder.into_result();
        assert_eq!(result.occurrences.get("Error"), Some(&0));
    }

    #[test]
    fn test_ensure_pattern_keeps_existing_count() {
        let recorder = PassRecorder::new();
        recorder.record_occurrence("Error");
        recorder.ensure_pattern("Error");
        let result = recorder.into_result();
        assert_eq!(result.occurrences.get("Error"), Some(&1));
    }

    #[test]
    fn test_match_text_counts_nest_per_pattern() {
        let recorder = PassRecorder::new();
        recorder.record_match_text("Levels", "Error");
        recorder.record_match_text("Levels", "Error");
        recorder.record_match_text("Levels", "Warn");

        let result = recorder.into_result();
        let levels = result.matches.get("Levels").unwrap();
        assert_eq!(levels.get("Error"), Some(&2));
        assert_eq!(levels.get("Warn"), Some(&1));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let recorder = PassRecorder::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let recorder = recorder.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        recorder.record_occurrence("Error");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let result = recorder.into_result();
        assert_eq!(result.occurrences.get("Error"), Some(&8000));
    }

    #[test]
    fn test_winning_pointer_is_max_creation_time() {
        let recorder = PassRecorder::new();
        recorder.push_pointer(pointer("/logs/app-1.log", 100));
        recorder.push_pointer(pointer("/logs/app-3.log", 300));
        recorder.push_pointer(pointer("/logs/app-2.log", 200));

        let result = recorder.into_result();
        assert_eq!(result.winning_pointer().unwrap().filename, "/logs/app-3.log");
    }

    #[test]
    fn test_winning_pointer_tie_breaks_on_filename() {
        let recorder = PassRecorder::new();
        recorder.push_pointer(pointer("/logs/app-1.log", 100));
        recorder.push_pointer(pointer("/logs/app-2.log", 100));

        let result = recorder.into_result();
        assert_eq!(result.winning_pointer().unwrap().filename, "/logs/app-2.log");
    }

    #[test]
    fn test_winning_file_size_follows_winning_pointer() {
        let recorder = PassRecorder::new();
        recorder.push_pointer(pointer("/logs/app-1.log", 100));
        recorder.push_pointer(pointer("/logs/app-2.log", 200));
        recorder.record_file_size("/logs/app-1.log", 111);
        recorder.record_file_size("/logs/app-2.log", 222);

        let result = recorder.into_result();
        assert_eq!(result.winning_file_size(), Some(222));
    }
}
