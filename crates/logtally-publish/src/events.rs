use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use logtally_types::MatchEvent;

/// Error delivering events to a sink
#[derive(Error, Debug)]
pub enum EventSinkError {
    #[error("failed to append events to [{path}]")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Boundary for handing captured match events to an events store
///
/// Delivery is at-most-once; a failed publish is logged and dropped.
pub trait EventSink: Send + Sync {
    fn publish(&self, events: &[MatchEvent]) -> Result<(), EventSinkError>;
}

/// Encode events as JSON strings, skipping any that fail to serialize
pub fn encode_events(events: &[MatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match serde_json::to_string(event) {
            Ok(json) => Some(json),
            Err(err) => {
                error!(
                    "failed to encode event for log {}: {err}",
                    event.log_display_name
                );
                None
            }
        })
        .collect()
}

/// Sink appending one JSON object per line to a local file
pub struct JsonLinesEventSink {
    path: PathBuf,
}

impl JsonLinesEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonLinesEventSink {
    fn publish(&self, events: &[MatchEvent]) -> Result<(), EventSinkError> {
        if events.is_empty() {
            return Ok(());
        }

        let io_err = |source| EventSinkError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        for line in encode_events(events) {
            writeln!(file, "{line}").map_err(io_err)?;
        }

        info!("published {} event(s) to {}", events.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> MatchEvent {
        MatchEvent {
            log_display_name: "TestLog".to_string(),
            search_pattern: "error".to_string(),
            search_pattern_display_name: "Error".to_string(),
            log_match: "ERROR boom\ncontext\n".to_string(),
        }
    }

    #[test]
    fn test_encoded_events_use_camel_case_fields() {
        let encoded = encode_events(&[sample_event()]);
        assert_eq!(encoded.len(), 1);

        let value: serde_json::Value = serde_json::from_str(&encoded[0]).unwrap();
        assert_eq!(value["logDisplayName"], "TestLog");
        assert_eq!(value["searchPattern"], "error");
        assert_eq!(value["searchPatternDisplayName"], "Error");
        assert_eq!(value["logMatch"], "ERROR boom\ncontext\n");
    }

    #[test]
    fn test_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonLinesEventSink::new(&path);

        sink.publish(&[sample_event()]).unwrap();
        sink.publish(&[sample_event(), sample_event()]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_publishing_no_events_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonLinesEventSink::new(&path);

        sink.publish(&[]).unwrap();
        assert!(!path.exists());
    }
}
