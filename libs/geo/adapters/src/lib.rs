pub mod arcgis;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{AdapterError, AdapterResult, ErrorCategory};
pub use registry::AdapterRegistry;
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::Path;

pub type ProgressCallback<'a> = &'a (dyn Fn(i64, Option<i64>) + Send + Sync);
pub type CancelCheck<'a> = &'a (dyn Fn() -> bool + Send + Sync);

/// The contract every provider kind (ArcGIS, WFS, CKAN, ...) must satisfy.
/// Only the ArcGIS adapter is concretely implemented; this trait is the
/// seam new providers attach to.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_kind(&self) -> &'static str;

    /// Makes a single cheap call against `root_url` to discover real server
    /// capabilities. Never fails outright: a failed probe yields
    /// [`ServerCapabilities::default`].
    async fn probe_capabilities(&self, root_url: &str) -> ServerCapabilities;

    async fn health_check(&self) -> bool;

    /// A lazy, finite, non-restartable sequence of datasets discovered by
    /// walking `root_url`'s catalog. One adapter instance is shared across
    /// every server of its provider kind, so the catalog root is supplied
    /// per call rather than fixed at construction.
    fn discover_datasets<'a>(&'a self, root_url: &'a str) -> BoxStream<'a, AdapterResult<DatasetMetadata>>;

    /// Tries the cheapest available signal first; always returns a result,
    /// marking it `conclusive: false` rather than propagating an error when
    /// nothing usable could be compared.
    async fn check_changed(
        &self,
        dataset: &DatasetRef,
        cached: &CachedChangeHints,
    ) -> ChangeCheckInfo;

    async fn download_simple(&self, dataset: &DatasetRef, out_path: &Path) -> AdapterResult<DownloadResult>;

    async fn download_paged(
        &self,
        dataset: &DatasetRef,
        out_path: &Path,
        progress: ProgressCallback<'_>,
        cancel: CancelCheck<'_>,
    ) -> AdapterResult<DownloadResult>;

    /// Only called when [`ServerCapabilities::supports_oid_range_parallelism`]
    /// is true; falls back to `download_paged` otherwise at the call site.
    async fn download_parallel(
        &self,
        dataset: &DatasetRef,
        out_path: &Path,
        worker_count: usize,
        progress: ProgressCallback<'_>,
        cancel: CancelCheck<'_>,
    ) -> AdapterResult<DownloadResult>;

    /// Downloads a single caller-supplied OID range, used by the per-chunk
    /// worker when a dataset's chunk rows were precomputed at fan-out time.
    async fn download_oid_chunk(
        &self,
        dataset: &DatasetRef,
        min_oid: i64,
        max_oid: i64,
        out_path: &Path,
    ) -> AdapterResult<DownloadResult>;

    async fn get_preview(&self, dataset: &DatasetRef, limit: u32) -> AdapterResult<serde_json::Value>;

    async fn get_feature_count(&self, dataset: &DatasetRef) -> AdapterResult<i64>;
}

/// Threshold-based strategy selection per the adapter contract: small
/// datasets page, mid-size ones parallelize when the server allows it,
/// everything else falls back to paging.
pub fn select_download_strategy(feature_count: Option<i64>, capabilities: &ServerCapabilities) -> DownloadStrategyChoice {
    match feature_count {
        Some(n) if n < 5_000 => DownloadStrategyChoice::Paged,
        Some(n) if n >= 5_000 && capabilities.supports_oid_range_parallelism => {
            DownloadStrategyChoice::Parallel
        }
        _ => DownloadStrategyChoice::Paged,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadStrategyChoice {
    Paged,
    Parallel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_dataset_always_pages() {
        let caps = ServerCapabilities {
            supports_oid_range_parallelism: true,
            ..Default::default()
        };
        assert_eq!(select_download_strategy(Some(100), &caps), DownloadStrategyChoice::Paged);
    }

    #[test]
    fn large_dataset_parallelizes_when_supported() {
        let caps = ServerCapabilities {
            supports_oid_range_parallelism: true,
            ..Default::default()
        };
        assert_eq!(select_download_strategy(Some(20_000), &caps), DownloadStrategyChoice::Parallel);
    }

    #[test]
    fn large_dataset_falls_back_to_paged_without_oid_support() {
        let caps = ServerCapabilities {
            supports_oid_range_parallelism: false,
            ..Default::default()
        };
        assert_eq!(select_download_strategy(Some(20_000), &caps), DownloadStrategyChoice::Paged);
    }

    #[test]
    fn default_capabilities_match_the_arcgis_probe_fallback_contract() {
        let caps = ServerCapabilities::default();
        assert_eq!(caps.max_record_count, Some(1000));
        assert!(caps.supports_pagination);
        assert!(caps.supports_oid_range_parallelism);
        assert_eq!(caps.oid_field_name.as_deref(), Some("OBJECTID"));
        assert!(caps.output_formats.iter().any(|f| f == "geojson"));
    }

    #[test]
    fn unknown_count_pages() {
        let caps = ServerCapabilities::default();
        assert_eq!(select_download_strategy(None, &caps), DownloadStrategyChoice::Paged);
    }
}
