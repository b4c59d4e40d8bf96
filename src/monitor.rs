use std::sync::Arc;

use tracing::{debug, error, info};

use logtally_engine::{run_pass, PassSettings};
use logtally_publish::{EventSink, MetricWriter};
use logtally_state::PointerStore;
use logtally_types::LogConfig;

/// Everything one monitoring pass over all configured logs needs
pub struct Monitor {
    pub logs: Vec<Arc<LogConfig>>,
    pub store: PointerStore,
    pub settings: PassSettings,
    pub metric_prefix: String,
    pub writer: Arc<dyn MetricWriter>,
    pub sink: Option<Arc<dyn EventSink>>,
}

impl Monitor {
    /// Run one pass over every configured log, one task per log
    ///
    /// Pass failures are scoped to their log; the other tasks keep running
    /// and the run itself always completes.
    pub async fn run_once(&self) {
        let mut handles = Vec::with_capacity(self.logs.len());
        for log in &self.logs {
            info!("starting the log monitoring task for log {}", log.display_name);
            handles.push(tokio::spawn(monitor_log(
                Arc::clone(log),
                self.store.clone(),
                self.settings,
                self.metric_prefix.clone(),
                Arc::clone(&self.writer),
                self.sink.clone(),
            )));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                error!("log monitoring task panicked: {err}");
            }
        }
    }
}

async fn monitor_log(
    log: Arc<LogConfig>,
    store: PointerStore,
    settings: PassSettings,
    metric_prefix: String,
    writer: Arc<dyn MetricWriter>,
    sink: Option<Arc<dyn EventSink>>,
) {
    match run_pass(Arc::clone(&log), store.clone(), settings).await {
        Ok(result) => {
            let metrics =
                logtally_publish::build_metrics(log.metric_label(), &metric_prefix, &result);
            info!(
                "publishing {} metric(s) for log {}",
                metrics.len(),
                log.display_name
            );
            writer.write(&metrics);

            if let Some(sink) = &sink {
                if result.events.is_empty() {
                    debug!("no events to publish for log {}, skipping", log.display_name);
                } else if let Err(err) = sink.publish(&result.events) {
                    error!("failed to publish events for log {}: {err}", log.display_name);
                }
            }

            // Pointer state is saved after every processed log so a crash
            // between logs loses at most the unsaved passes.
            store.persist_logged();
        }
        Err(err) => {
            error!("log monitoring pass failed for {}: {err:#}", log.display_name);
        }
    }
    info!("completed the log monitoring task for log {}", log.display_name);
}
