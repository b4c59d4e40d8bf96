use std::path::Path;

use tracing::debug;

use logtally_types::FilePointer;

/// Classify whether the logical log has rotated since the pointer was saved
///
/// Two independent triggers, either sufficient: the active file's path
/// differs from the pointer's recorded filename, or the active file is now
/// smaller than the recorded offset (in-place truncation under the same
/// name). A rotated pass reprocesses every candidate file from offset 0,
/// except the file whose creation time equals the pointer's, which resumes
/// mid-file.
pub fn has_rolled_over(pointer: &FilePointer, active_path: &Path, active_len: u64) -> bool {
    if is_filename_changed(pointer, active_path) || is_truncated(pointer, active_len) {
        debug!(
            "file {} has changed or rotated, resetting position to 0",
            pointer.filename
        );
        return true;
    }
    false
}

fn is_filename_changed(pointer: &FilePointer, active_path: &Path) -> bool {
    !pointer.refers_to(active_path)
}

fn is_truncated(pointer: &FilePointer, active_len: u64) -> bool {
    active_len < pointer.last_read_position
}
