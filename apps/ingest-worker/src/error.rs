use geo_adapters::AdapterError;
use geo_catalog::CatalogError;
use geo_jobs::JobError;
use geo_storage::StorageError;
use stream_worker::StreamError;

/// `StreamError::Processing` is the closest fit for "the job failed for a
/// domain reason"; the retry-vs-DLQ decision then falls out of its
/// substring-based categorization, same as every other processor in this
/// worker family.
fn processing(err: impl std::fmt::Display) -> StreamError {
    StreamError::Processing(err.to_string())
}

pub fn job_err(e: JobError) -> StreamError {
    processing(e)
}

pub fn catalog_err(e: CatalogError) -> StreamError {
    processing(e)
}

pub fn adapter_err(e: AdapterError) -> StreamError {
    processing(e)
}

pub fn storage_err(e: StorageError) -> StreamError {
    processing(e)
}
