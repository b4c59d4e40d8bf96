//! Publishing boundary
//!
//! Flattens a pass result into the pipe-delimited metric list handed to a
//! metric writer, and serializes captured match events for the events sink.
//! Transport to an actual monitoring backend is out of scope; the shipped
//! writer and sink log and append locally.

pub mod events;
pub mod metrics;

pub use events::{EventSink, EventSinkError, JsonLinesEventSink};
pub use metrics::{build_metrics, MetricWriter, TracingMetricWriter};
