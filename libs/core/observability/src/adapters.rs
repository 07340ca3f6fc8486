//! Provider-adapter metrics: upstream request volume, retries, and change detection.

use metrics::{counter, histogram};

/// Provider-adapter metrics recorder.
pub struct AdapterMetrics;

impl AdapterMetrics {
    pub fn record_request(provider_kind: &str, outcome: &str) {
        counter!(
            "ingest_adapter_requests_total",
            "provider_kind" => provider_kind.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    pub fn record_retry(provider_kind: &str) {
        counter!("ingest_adapter_retries_total", "provider_kind" => provider_kind.to_string())
            .increment(1);
    }

    pub fn record_change_check(provider_kind: &str, method: &str, changed: bool) {
        counter!(
            "ingest_change_checks_total",
            "provider_kind" => provider_kind.to_string(),
            "method" => method.to_string(),
            "changed" => changed.to_string()
        )
        .increment(1);
    }

    pub fn record_page_fetch_duration(provider_kind: &str, duration_secs: f64) {
        histogram!(
            "ingest_adapter_page_fetch_duration_seconds",
            "provider_kind" => provider_kind.to_string()
        )
        .record(duration_secs);
    }
}
