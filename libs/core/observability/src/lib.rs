//! Observability utilities for the catalog ingestion engine.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Custom metrics for job orchestration, provider adapters, and storage backends
//! - Axum middleware for automatic request metrics (health/metrics endpoints)
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, JobMetrics};
//!
//! init_metrics();
//!
//! JobMetrics::record_started("downloads");
//! JobMetrics::record_completed("downloads", 12.4);
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod adapters;
pub mod jobs;
pub mod middleware;
pub mod storage;

pub use adapters::AdapterMetrics;
pub use jobs::JobMetrics;
pub use middleware::MetricsLayer;
pub use storage::StorageMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup.
/// Returns the PrometheusHandle for rendering metrics.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        handle
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Job orchestrator metrics
    describe_counter!(
        "ingest_jobs_total",
        "Total crawl/download/export jobs by queue and terminal status"
    );
    describe_histogram!(
        "ingest_job_duration_seconds",
        "Job duration from pickup to terminal state"
    );
    describe_counter!(
        "ingest_job_retries_total",
        "Task-level retries by queue"
    );
    describe_gauge!(
        "ingest_download_chunks_in_progress",
        "In-flight download chunks for a download job"
    );
    describe_counter!(
        "ingest_features_downloaded_total",
        "Features downloaded per dataset"
    );

    // Provider adapter metrics
    describe_counter!(
        "ingest_adapter_requests_total",
        "Upstream provider requests by kind and outcome"
    );
    describe_counter!(
        "ingest_adapter_retries_total",
        "Upstream request retries by provider kind"
    );
    describe_counter!(
        "ingest_change_checks_total",
        "Change-detection probes by provider kind, method, and result"
    );
    describe_histogram!(
        "ingest_adapter_page_fetch_duration_seconds",
        "Duration of a single paged-download page fetch"
    );

    // Storage backend metrics
    describe_counter!(
        "ingest_storage_operations_total",
        "Storage backend store operations by backend and outcome"
    );
    describe_histogram!(
        "ingest_storage_operation_duration_seconds",
        "Duration of a storage backend store_dataset call"
    );
    describe_counter!(
        "ingest_tile_builds_total",
        "Vector-tile archive builds by outcome"
    );
    describe_histogram!(
        "ingest_tile_build_duration_seconds",
        "Duration of external tiling tool invocations"
    );
}
