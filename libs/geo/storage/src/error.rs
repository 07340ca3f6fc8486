use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] database::common::DatabaseError),

    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("geojson parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("tile generation failed: {0}")]
    TileGeneration(String),

    #[error("download cancelled mid-store")]
    Cancelled,

    #[error("dataset has no features to store")]
    EmptyDataset,
}

pub type StorageResult<T> = Result<T, StorageError>;
