use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::queue::TaskQueue;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub queue: Arc<TaskQueue>,
}

/// Prometheus scrape endpoint. Samples the queue depth before rendering.
pub async fn prometheus_metrics(State(scrape): State<MetricsState>) -> String {
    match scrape.queue.queue_depth().await {
        Ok(depth) => metrics::gauge!("shorts_queue_depth").set(depth as f64),
        Err(e) => tracing::debug!(error = %e, "Queue depth unavailable"),
    }
    scrape.handle.render()
}

/// Register descriptions for every metric the server and worker emit.
pub fn describe() {
    metrics::describe_counter!("shorts_jobs_submitted_total", "Jobs accepted from the submission form");
    metrics::describe_counter!("shorts_jobs_completed_total", "Jobs whose pipeline finished");
    metrics::describe_counter!("shorts_jobs_failed_total", "Jobs marked failed by the pipeline");
    metrics::describe_histogram!("shorts_pipeline_seconds", "Wall-clock time of a completed pipeline");
    metrics::describe_histogram!("shorts_stage_seconds", "Time spent in one pipeline stage");
    metrics::describe_counter!("shorts_uploads_total", "YouTube uploads by outcome");
    metrics::describe_gauge!("shorts_queue_depth", "Tasks waiting in the Redis queue");
}
