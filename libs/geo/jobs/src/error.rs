use database::common::DatabaseError;
use stream_worker::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("catalog error: {0}")]
    Catalog(#[from] geo_catalog::CatalogError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("job {0} not found")]
    NotFound(uuid::Uuid),

    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    #[error("permanent upstream failure: {0}")]
    PermanentUpstream(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("job cancelled")]
    Cancelled,
}

pub type JobResult<T> = Result<T, JobError>;
