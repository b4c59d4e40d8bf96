use tracing::info;

use logtally_engine::PassResult;
use logtally_types::{
    Metric, FILESIZE_METRIC_NAME, MATCHES, METRIC_SEPARATOR, OCCURRENCES, SEARCH_STRING,
};

/// Flatten one pass result into the published metric list
///
/// Naming scheme:
/// `<log>|Search String|<pattern>|Occurrences`,
/// `<log>|Search String|<pattern>|Matches|<literal>` when capture is on,
/// and `<log>|File size (Bytes)`. Every configured pattern appears with an
/// Occurrences value, "0" included. Output order is deterministic.
pub fn build_metrics(log_label: &str, metric_prefix: &str, result: &PassResult) -> Vec<Metric> {
    let mut metrics = Vec::new();

    for (pattern, count) in &result.occurrences {
        let name = search_metric_name(log_label, pattern, OCCURRENCES);
        metrics.push(Metric::new(name, count.to_string(), metric_prefix));
    }

    for (pattern, breakdown) in &result.matches {
        for (literal, count) in breakdown {
            let name = format!(
                "{}{}{}",
                search_metric_name(log_label, pattern, MATCHES),
                METRIC_SEPARATOR,
                literal
            );
            metrics.push(Metric::new(name, count.to_string(), metric_prefix));
        }
    }

    if let Some(len) = result.winning_file_size() {
        let name = format!("{log_label}{METRIC_SEPARATOR}{FILESIZE_METRIC_NAME}");
        metrics.push(Metric::new(name, len.to_string(), metric_prefix));
    }

    metrics
}

fn search_metric_name(log_label: &str, pattern: &str, leaf: &str) -> String {
    format!(
        "{log_label}{sep}{SEARCH_STRING}{sep}{pattern}{sep}{leaf}",
        sep = METRIC_SEPARATOR
    )
}

/// Boundary for handing finished metrics to a monitoring backend
pub trait MetricWriter: Send + Sync {
    fn write(&self, metrics: &[Metric]);
}

/// Writer that reports each metric through the process log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMetricWriter;

impl MetricWriter for TracingMetricWriter {
    fn write(&self, metrics: &[Metric]) {
        for metric in metrics {
            info!("metric {} = {}", metric.path, metric.value);
        }
    }
}
