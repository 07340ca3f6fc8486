//! Job-orchestrator metrics: crawl, download, and export job lifecycle.

use metrics::{counter, gauge, histogram};

/// Job lifecycle metrics recorder.
pub struct JobMetrics;

impl JobMetrics {
    pub fn record_started(queue: &str) {
        counter!("ingest_jobs_total", "queue" => queue.to_string(), "status" => "started")
            .increment(1);
    }

    pub fn record_completed(queue: &str, duration_secs: f64) {
        counter!("ingest_jobs_total", "queue" => queue.to_string(), "status" => "completed")
            .increment(1);
        histogram!("ingest_job_duration_seconds", "queue" => queue.to_string())
            .record(duration_secs);
    }

    pub fn record_failed(queue: &str, duration_secs: f64) {
        counter!("ingest_jobs_total", "queue" => queue.to_string(), "status" => "failed")
            .increment(1);
        histogram!("ingest_job_duration_seconds", "queue" => queue.to_string())
            .record(duration_secs);
    }

    pub fn record_cancelled(queue: &str) {
        counter!("ingest_jobs_total", "queue" => queue.to_string(), "status" => "cancelled")
            .increment(1);
    }

    pub fn record_retry(queue: &str) {
        counter!("ingest_job_retries_total", "queue" => queue.to_string()).increment(1);
    }

    pub fn set_chunks_in_progress(download_job_id: &str, count: usize) {
        gauge!("ingest_download_chunks_in_progress", "download_job" => download_job_id.to_string())
            .set(count as f64);
    }

    pub fn record_features_downloaded(dataset_id: &str, count: u64) {
        counter!("ingest_features_downloaded_total", "dataset" => dataset_id.to_string())
            .increment(count);
    }
}
