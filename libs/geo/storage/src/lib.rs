pub mod cancellation;
pub mod error;
pub mod hybrid;
pub mod object_store_backend;
pub mod spatial_db;
pub mod tile_generator;

pub use cancellation::{CancellationCheck, JobCancellation, NeverCancelled};
pub use error::{StorageError, StorageResult};
pub use hybrid::HybridStorageRouter;
pub use object_store_backend::{build_object_store, ObjectStoreBackend};
pub use spatial_db::SpatialDbBackend;
pub use tile_generator::TileBuildConfig;

use async_trait::async_trait;
use geo_catalog::dataset::StorageMode;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Reports (features_written_or_stored, total_if_known) after each batch.
pub type ProgressCallback<'a> = &'a (dyn Fn(i64, Option<i64>) + Send + Sync);

#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Clone, Debug)]
pub struct StoreOutcome {
    pub storage_mode: StorageMode,
    pub cache_table_name: Option<String>,
    pub object_data_key: Option<String>,
    pub object_tile_key: Option<String>,
    pub feature_count: i64,
    pub tile_built: bool,
}

/// Common contract every storage backend satisfies. Both sides stream: a
/// multi-gigabyte GeoJSON input is never materialized in memory.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn store_dataset(
        &self,
        dataset_id: Uuid,
        geojson_path: &Path,
        cancellation: &dyn CancellationCheck,
        progress: ProgressCallback<'_>,
    ) -> StorageResult<StoreOutcome>;

    async fn retrieve_dataset(
        &self,
        dataset_id: Uuid,
        bbox: Option<BoundingBox>,
    ) -> StorageResult<PathBuf>;
}
