//! Periodic sweep of expired exports.
//!
//! The export pipeline itself only ever sets `expires_at`; nothing else in
//! the system clears the objects once that time passes. This runs
//! independently of the stream workers (no job, no retry, no DLQ) since
//! there's nothing upstream to report failure to — a failed sweep just
//! tries again next tick.

use geo_jobs::ExportJobRepository;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Runs until `shutdown` fires, sweeping expired exports every `interval`.
pub async fn run(
    export_repo: ExportJobRepository,
    object_store: Arc<dyn ObjectStore>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(&export_repo, &object_store).await {
                    error!(error = %e, "export janitor sweep failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("export janitor shutting down");
                    return;
                }
            }
        }
    }
}

async fn sweep_once(
    export_repo: &ExportJobRepository,
    object_store: &Arc<dyn ObjectStore>,
) -> geo_jobs::JobResult<()> {
    let expired = export_repo.find_expired(chrono::Utc::now()).await?;
    if expired.is_empty() {
        return Ok(());
    }
    delete_expired(expired, object_store).await;
    Ok(())
}

/// Deletes the object-storage artifact for each expired export job.
///
/// Never fails: a missing `output_key` or a failed delete is logged and
/// skipped rather than aborting the sweep, since one bad row shouldn't block
/// cleanup of the rest.
async fn delete_expired(jobs: Vec<geo_jobs::entities::export_job::Model>, object_store: &Arc<dyn ObjectStore>) {
    info!(count = jobs.len(), "sweeping expired exports");

    for job in jobs {
        let Some(key) = job.output_key.as_ref() else {
            warn!(job_id = %job.id, "expired export has no output_key, skipping");
            continue;
        };
        match object_store.delete(&ObjectPath::from(key.as_str())).await {
            Ok(()) => info!(job_id = %job.id, key = %key, "deleted expired export object"),
            Err(e) => warn!(job_id = %job.id, key = %key, error = %e, "failed to delete expired export object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;
    use geo_jobs::entities::export_job;
    use geo_jobs::entities::status::JobStatus;
    use object_store::memory::InMemory;
    use uuid::Uuid;

    fn job(output_key: Option<&str>) -> export_job::Model {
        export_job::Model {
            id: Uuid::new_v4(),
            dataset_ids: vec![],
            status: JobStatus::Completed,
            created_at: Utc::now().into(),
            started_at: None,
            completed_at: None,
            error: None,
            retry_count: 0,
            worker_task_id: None,
            output_format: "geojson".to_string(),
            clip_polygon_wkt: None,
            expires_at: Some(Utc::now()),
            output_key: output_key.map(String::from),
            format_parameters: None,
            requested_by: None,
        }
    }

    #[tokio::test]
    async fn deletes_object_for_each_expired_job_with_a_key() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let key = "exports/job-1/data.geojson";
        store
            .put(&ObjectPath::from(key), Bytes::from_static(b"{}").into())
            .await
            .expect("seed object");

        delete_expired(vec![job(Some(key))], &store).await;

        assert!(store.get(&ObjectPath::from(key)).await.is_err());
    }

    #[tokio::test]
    async fn skips_jobs_without_an_output_key_without_panicking() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        delete_expired(vec![job(None)], &store).await;
    }

    #[tokio::test]
    async fn tolerates_a_delete_for_an_object_that_is_already_gone() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        delete_expired(vec![job(Some("exports/already-deleted/data.geojson"))], &store).await;
    }
}
