//! Storage-backend metrics: spatial-DB writes, object-store writes, tile generation.

use metrics::{counter, histogram};

/// Storage-backend metrics recorder.
pub struct StorageMetrics;

impl StorageMetrics {
    pub fn record_store(backend: &str, outcome: &str, duration_secs: f64) {
        counter!(
            "ingest_storage_operations_total",
            "backend" => backend.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!("ingest_storage_operation_duration_seconds", "backend" => backend.to_string())
            .record(duration_secs);
    }

    pub fn record_tile_build(outcome: &str, duration_secs: f64) {
        counter!("ingest_tile_builds_total", "outcome" => outcome.to_string()).increment(1);
        histogram!("ingest_tile_build_duration_seconds").record(duration_secs);
    }
}
