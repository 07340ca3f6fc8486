use database::common::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("server {0} not found")]
    ServerNotFound(uuid::Uuid),

    #[error("dataset {0} not found")]
    DatasetNotFound(uuid::Uuid),

    #[error("dataset cache invariant violated for {0}: is_cached does not match recorded cache location")]
    CacheInvariantViolation(uuid::Uuid),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
