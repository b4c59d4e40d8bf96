use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use logtally_state::PointerStore;
use logtally_types::LogConfig;

use crate::encoding;
use crate::pattern::{self, PatternError};
use crate::recorder::{PassRecorder, PassResult};
use crate::resolver::{self, ResolveError};
use crate::rotation;
use crate::scanner;

/// Process-wide settings a pass needs beyond the log's own configuration
#[derive(Clone, Copy, Debug, Default)]
pub struct PassSettings {
    /// Trailing context lines captured into each match event
    pub match_context_lines: usize,

    /// Whether match events are produced at all
    pub events_enabled: bool,
}

impl PassSettings {
    fn event_context(&self) -> Option<usize> {
        self.events_enabled.then_some(self.match_context_lines)
    }
}

/// Errors failing one logical log's pass; never fatal to the process
#[derive(Error, Debug)]
pub enum PassError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to inspect [{path}]")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run one full pass over one logical log
///
/// RESOLVE the active physical file, classify the pass as continuous or
/// rotated, dispatch one scanner per file to process, wait for all of them
/// at the completion barrier, then COMMIT the winning pointer back to the
/// store. Returns the aggregated result for publishing.
pub async fn run_pass(
    log: Arc<LogConfig>,
    store: PointerStore,
    settings: PassSettings,
) -> Result<PassResult, PassError> {
    info!("starting metric collection pass for log {}", log.display_name);

    let Some(active) = resolver::resolve_active_file(&log.directory, &log.filename_pattern)?
    else {
        info!(
            "no file matching {} in {}, skipping",
            log.filename_pattern,
            log.directory.display()
        );
        return Ok(PassResult::default());
    };

    let logical_path = log.logical_path();
    let pointer = store.get_or_insert(&logical_path, &active.display().to_string());
    let patterns = Arc::new(pattern::compile(&log.search)?);

    let active_len = fs::metadata(&active)
        .map_err(|source| PassError::Inspect {
            path: active.clone(),
            source,
        })?
        .len();

    // Each entry is a physical file paired with its start offset.
    let files = if rotation::has_rolled_over(&pointer, &active, active_len) {
        let candidates = resolver::files_created_since(
            &log.directory,
            &log.filename_pattern,
            pointer.file_creation_time,
        )?;
        let mut files = Vec::with_capacity(candidates.len());
        for path in candidates {
            let created = resolver::creation_time_millis(&path).map_err(|source| {
                PassError::Inspect {
                    path: path.clone(),
                    source,
                }
            })?;
            // The file active when the pointer was last saved resumes
            // mid-file; everything newer starts from the top.
            let start = if created == pointer.file_creation_time {
                pointer.last_read_position
            } else {
                0
            };
            files.push((path, start));
        }
        files
    } else {
        vec![(active, pointer.last_read_position)]
    };

    let recorder = PassRecorder::new();
    let mut handles = Vec::with_capacity(files.len());
    for (path, start) in files {
        if let Some(label) = &log.encoding {
            if let Err(err) = encoding::convert_to_utf8(&path, label) {
                error!("skipping {}: {err}", path.display());
                continue;
            }
        }

        let recorder = recorder.clone();
        let patterns = Arc::clone(&patterns);
        let log = Arc::clone(&log);
        let event_context = settings.event_context();
        handles.push(tokio::task::spawn_blocking(move || {
            if let Err(err) = scanner::scan_file(
                &path,
                start,
                &patterns,
                &recorder,
                &log,
                event_context,
            ) {
                error!("error while processing log file for {}: {err}", log.display_name);
            }
        }));
    }

    // Completion barrier: the commit below must not run before every
    // dispatched scanner has finished, success or failure.
    for handle in handles {
        if let Err(err) = handle.await {
            error!("scanner task for {} panicked: {err}", log.display_name);
        }
    }

    let result = recorder.into_result();
    match result.winning_pointer() {
        Some(winner) => {
            debug!(
                "updating file pointer for {logical_path}: file {} at position {} created {}",
                winner.filename, winner.last_read_position, winner.file_creation_time
            );
            store.update(
                &logical_path,
                &winner.filename,
                winner.last_read_position,
                winner.file_creation_time,
            );
        }
        None => warn!("no file pointer produced for {logical_path}, keeping previous state"),
    }

    Ok(result)
}
