use crate::cancellation::CancellationCheck;
use crate::error::StorageResult;
use crate::{BoundingBox, ObjectStoreBackend, ProgressCallback, SpatialDbBackend, StorageBackend, StoreOutcome};
use core_config::ingest::{IngestConfig, StorageBackendSelector};
use geo_catalog::dataset::DownloadStrategy;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Host-wide policy deciding which concrete backend stores a given dataset.
/// The decision is exclusive (a dataset lives in exactly one backend at a
/// time), not a dual-write: see the open design question this resolves.
pub struct HybridStorageRouter {
    spatial_db: SpatialDbBackend,
    object_store: ObjectStoreBackend,
    config: IngestConfig,
}

impl HybridStorageRouter {
    pub fn new(spatial_db: SpatialDbBackend, object_store: ObjectStoreBackend, config: IngestConfig) -> Self {
        Self {
            spatial_db,
            object_store,
            config,
        }
    }

    /// Chooses a backend for a dataset given its best current feature-count
    /// estimate and recorded download strategy. `DISTRIBUTED` is treated
    /// the same as `CHUNKED` until a dedicated landing-area pipeline is
    /// specified.
    pub fn choose_backend(&self, feature_count: Option<i64>, strategy: &DownloadStrategy) -> BackendChoice {
        choose_backend(&self.config, feature_count, strategy)
    }

    pub async fn store_dataset(
        &self,
        dataset_id: Uuid,
        geojson_path: &Path,
        feature_count_hint: Option<i64>,
        strategy: &DownloadStrategy,
        cancellation: &dyn CancellationCheck,
        progress: ProgressCallback<'_>,
    ) -> StorageResult<StoreOutcome> {
        match self.choose_backend(feature_count_hint, strategy) {
            BackendChoice::SpatialDb => {
                self.spatial_db
                    .store_dataset(dataset_id, geojson_path, cancellation, progress)
                    .await
            }
            BackendChoice::ObjectStore => {
                self.object_store
                    .store_dataset(dataset_id, geojson_path, cancellation, progress)
                    .await
            }
        }
    }

    pub async fn retrieve_dataset(
        &self,
        dataset_id: Uuid,
        bbox: Option<BoundingBox>,
        stored_in: BackendChoice,
    ) -> StorageResult<PathBuf> {
        match stored_in {
            BackendChoice::SpatialDb => self.spatial_db.retrieve_dataset(dataset_id, bbox).await,
            BackendChoice::ObjectStore => self.object_store.retrieve_dataset(dataset_id, bbox).await,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    SpatialDb,
    ObjectStore,
}

fn choose_backend(config: &IngestConfig, feature_count: Option<i64>, strategy: &DownloadStrategy) -> BackendChoice {
    match config.storage_backend {
        StorageBackendSelector::Postgis => BackendChoice::SpatialDb,
        StorageBackendSelector::ObjectStorage => BackendChoice::ObjectStore,
        StorageBackendSelector::Hybrid => {
            if !config.use_object_storage_for_large_datasets {
                return BackendChoice::SpatialDb;
            }
            let large = feature_count
                .map(|n| n >= config.min_features_for_object_storage as i64)
                .unwrap_or(false);
            let chunked = matches!(strategy, DownloadStrategy::Chunked | DownloadStrategy::Distributed);
            if large || chunked {
                BackendChoice::ObjectStore
            } else {
                BackendChoice::SpatialDb
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(selector: StorageBackendSelector, min_features: u64, use_object_storage: bool) -> IngestConfig {
        IngestConfig {
            default_probe_frequency_hours: 24,
            default_download_timeout_secs: 3600,
            max_concurrent_downloads_per_server: 4,
            max_chunk_parallel: 10,
            storage_backend: selector,
            use_object_storage_for_large_datasets: use_object_storage,
            min_features_for_object_storage: min_features,
        }
    }

    #[test]
    fn postgis_forces_spatial_db_regardless_of_size() {
        let cfg = config(StorageBackendSelector::Postgis, 10, true);
        assert_eq!(
            choose_backend(&cfg, Some(1_000_000), &DownloadStrategy::Simple),
            BackendChoice::SpatialDb
        );
    }

    #[test]
    fn hybrid_routes_large_datasets_to_object_store() {
        let cfg = config(StorageBackendSelector::Hybrid, 10_000, true);
        assert_eq!(
            choose_backend(&cfg, Some(50_000), &DownloadStrategy::Simple),
            BackendChoice::ObjectStore
        );
    }

    #[test]
    fn hybrid_routes_small_datasets_to_spatial_db() {
        let cfg = config(StorageBackendSelector::Hybrid, 10_000, true);
        assert_eq!(
            choose_backend(&cfg, Some(100), &DownloadStrategy::Simple),
            BackendChoice::SpatialDb
        );
    }

    #[test]
    fn hybrid_routes_chunked_strategy_to_object_store_regardless_of_size() {
        let cfg = config(StorageBackendSelector::Hybrid, 10_000, true);
        assert_eq!(
            choose_backend(&cfg, Some(5), &DownloadStrategy::Chunked),
            BackendChoice::ObjectStore
        );
    }
}
