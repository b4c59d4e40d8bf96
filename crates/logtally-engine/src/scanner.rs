use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use logtally_types::{FilePointer, LogConfig, MatchEvent};

use crate::pattern::{canonical_capitalization, CompiledPattern};
use crate::recorder::PassRecorder;
use crate::resolver;

/// Error scanning one physical file
///
/// Aborts only that file's scan; counts already recorded by sibling scans
/// of the same pass are preserved.
#[derive(Error, Debug)]
#[error("failed to scan [{path}]")]
pub struct ScanError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Scan one physical file from `start_offset` to end of file
///
/// Reads newline-delimited lines, evaluates every compiled pattern per line,
/// and records occurrence counts, capture breakdowns and events into the
/// shared recorder. On success the file's byte length and pointer candidate
/// are recorded; on failure nothing about this file is committed.
///
/// `event_context` is `Some(n)` when an events sink is configured; each
/// match then emits a [`MatchEvent`] carrying the matched line plus up to
/// `n` trailing context lines.
pub fn scan_file(
    path: &Path,
    start_offset: u64,
    patterns: &[CompiledPattern],
    recorder: &PassRecorder,
    log: &LogConfig,
    event_context: Option<usize>,
) -> Result<(), ScanError> {
    let io_err = |source| ScanError {
        path: path.to_path_buf(),
        source,
    };

    for pattern in patterns {
        recorder.ensure_pattern(pattern.display_name());
    }

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(start_offset)).map_err(io_err)?;

    // Offset tracked manually: always the byte position immediately after
    // the last line consumed, which is what the pointer must record.
    let mut offset = start_offset;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(io_err)?;
        if read == 0 {
            break;
        }
        offset += read as u64;

        let line = decode_line(&buf);
        for pattern in patterns {
            for matched in pattern.find_matches(&line) {
                recorder.record_occurrence(pattern.display_name());
                debug!(
                    "match found for pattern {} in log {}",
                    pattern.display_name(),
                    log.display_name
                );

                if pattern.captures_matches() {
                    let trimmed = matched.trim();
                    let key = if pattern.is_case_sensitive() {
                        trimmed.to_string()
                    } else {
                        canonical_capitalization(trimmed)
                    };
                    recorder.record_match_text(pattern.display_name(), &key);
                }

                if let Some(context_lines) = event_context {
                    let captured = capture_with_context(&mut reader, offset, &line, context_lines)
                        .map_err(io_err)?;
                    recorder.push_event(MatchEvent {
                        log_display_name: log.display_name.clone(),
                        search_pattern: pattern.raw_pattern().to_string(),
                        search_pattern_display_name: pattern.display_name().to_string(),
                        log_match: captured,
                    });
                }
            }
        }
    }

    let len = reader.get_ref().metadata().map_err(io_err)?.len();
    let filename = path.display().to_string();
    recorder.record_file_size(&filename, len);

    let created = resolver::creation_time_millis(path).map_err(io_err)?;
    recorder.push_pointer(FilePointer {
        filename,
        last_read_position: offset,
        file_creation_time: created,
    });

    info!("successfully processed log file [{}]", path.display());
    Ok(())
}

/// The matched line followed by up to `context_lines` trailing lines, each
/// segment newline-terminated
///
/// Peeks ahead on the reader and seeks back to `resume_at`, so the main
/// scan cursor used for offset bookkeeping is undisturbed.
fn capture_with_context(
    reader: &mut BufReader<File>,
    resume_at: u64,
    line: &str,
    context_lines: usize,
) -> std::io::Result<String> {
    let mut captured = String::from(line);
    if context_lines == 0 {
        return Ok(captured);
    }

    captured.push('\n');
    let mut buf = Vec::new();
    for _ in 0..context_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        captured.push_str(&decode_line(&buf));
        captured.push('\n');
    }
    reader.seek(SeekFrom::Start(resume_at))?;
    Ok(captured)
}

/// Strip the line terminator and decode the remaining bytes as lossy UTF-8
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
