use crate::entities::crawl_job::{self, Entity as CrawlJobEntity};
use crate::entities::download_chunk::{self, Entity as DownloadChunkEntity};
use crate::entities::download_job::{self, Entity as DownloadJobEntity};
use crate::entities::export_job::{self, Entity as ExportJobEntity};
use crate::entities::status::JobStatus;
use crate::error::{JobError, JobResult};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

fn map_db(e: sea_orm::DbErr) -> JobError {
    JobError::Database(database::common::DatabaseError::from(e))
}

#[derive(Clone)]
pub struct CrawlJobRepository {
    db: DatabaseConnection,
}

impl CrawlJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, server_id: Uuid) -> JobResult<crawl_job::Model> {
        let model = crawl_job::ActiveModel {
            id: Set(Uuid::now_v7()),
            server_id: Set(server_id),
            status: Set(JobStatus::Pending),
            created_at: Set(Utc::now().into()),
            services_processed: Set(0),
            datasets_discovered: Set(0),
            datasets_new: Set(0),
            datasets_updated: Set(0),
            retry_count: Set(0),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(map_db)
    }

    pub async fn find_by_id(&self, id: Uuid) -> JobResult<crawl_job::Model> {
        CrawlJobEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db)?
            .ok_or(JobError::NotFound(id))
    }

    pub async fn mark_running(&self, id: Uuid, worker_task_id: &str) -> JobResult<crawl_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Running);
        model.started_at = Set(Some(Utc::now()));
        model.worker_task_id = Set(Some(worker_task_id.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn update_progress(
        &self,
        id: Uuid,
        services_processed: i32,
        datasets_discovered: i32,
        datasets_new: i32,
        datasets_updated: i32,
        current_stage: &str,
    ) -> JobResult<crawl_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.services_processed = Set(services_processed);
        model.datasets_discovered = Set(datasets_discovered);
        model.datasets_new = Set(datasets_new);
        model.datasets_updated = Set(datasets_updated);
        model.current_stage = Set(Some(current_stage.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_completed(&self, id: Uuid, total_services: i32) -> JobResult<crawl_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Completed);
        model.completed_at = Set(Some(Utc::now()));
        model.total_services = Set(Some(total_services));
        model.current_stage = Set(Some("complete".to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> JobResult<crawl_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Failed);
        model.completed_at = Set(Some(Utc::now()));
        model.error = Set(Some(error.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_cancelled(&self, id: Uuid) -> JobResult<crawl_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Cancelled);
        model.completed_at = Set(Some(Utc::now()));
        model.update(&self.db).await.map_err(map_db)
    }
}

#[derive(Clone)]
pub struct DownloadJobRepository {
    db: DatabaseConnection,
}

impl DownloadJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, dataset_id: Uuid, strategy_label: &str) -> JobResult<download_job::Model> {
        let model = download_job::ActiveModel {
            id: Set(Uuid::now_v7()),
            dataset_id: Set(dataset_id),
            status: Set(JobStatus::Pending),
            created_at: Set(Utc::now().into()),
            strategy_label: Set(strategy_label.to_string()),
            total_chunks: Set(0),
            chunks_completed: Set(0),
            features_downloaded: Set(0),
            retry_count: Set(0),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(map_db)
    }

    pub async fn find_by_id(&self, id: Uuid) -> JobResult<download_job::Model> {
        DownloadJobEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db)?
            .ok_or(JobError::NotFound(id))
    }

    /// Polled by workers at natural pause points (between pages/batches) to
    /// decide whether to keep going. Returns true once the job row has been
    /// flipped to `Cancelled` by an external actor.
    pub async fn is_cancelled(&self, id: Uuid) -> JobResult<bool> {
        Ok(self.find_by_id(id).await?.status == JobStatus::Cancelled)
    }

    pub async fn mark_running(&self, id: Uuid, worker_task_id: &str) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Running);
        model.started_at = Set(Some(Utc::now()));
        model.worker_task_id = Set(Some(worker_task_id.to_string()));
        model.current_stage = Set(Some("routing".to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn update_stage(&self, id: Uuid, stage: &str) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.current_stage = Set(Some(stage.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    /// Monotonically advances downloaded/total feature counters; called from
    /// the adapter's progress callback.
    pub async fn update_progress(
        &self,
        id: Uuid,
        features_downloaded: i64,
        features_total: Option<i64>,
    ) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.features_downloaded = Set(features_downloaded);
        if let Some(total) = features_total {
            model.features_total = Set(Some(total));
        }
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn set_total_chunks(&self, id: Uuid, total_chunks: i32) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.total_chunks = Set(total_chunks);
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn increment_chunks_completed(&self, id: Uuid) -> JobResult<download_job::Model> {
        let current = self.find_by_id(id).await?;
        let mut model = current.clone().into_active_model();
        model.chunks_completed = Set(current.chunks_completed + 1);
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_completed(&self, id: Uuid, output_path: &str) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Completed);
        model.completed_at = Set(Some(Utc::now()));
        model.output_path = Set(Some(output_path.to_string()));
        model.current_stage = Set(Some("complete".to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Failed);
        model.completed_at = Set(Some(Utc::now()));
        model.error = Set(Some(error.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_cancelled(&self, id: Uuid) -> JobResult<download_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Cancelled);
        model.completed_at = Set(Some(Utc::now()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn request_cancel(&self, id: Uuid) -> JobResult<download_job::Model> {
        let current = self.find_by_id(id).await?;
        if current.status.is_terminal() {
            return Ok(current);
        }
        let mut model = current.into_active_model();
        model.status = Set(JobStatus::Cancelled);
        model.completed_at = Set(Some(Utc::now()));
        model.update(&self.db).await.map_err(map_db)
    }
}

#[derive(Clone)]
pub struct DownloadChunkRepository {
    db: DatabaseConnection,
}

impl DownloadChunkRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_many(
        &self,
        models: Vec<download_chunk::ActiveModel>,
    ) -> JobResult<()> {
        if models.is_empty() {
            return Ok(());
        }
        DownloadChunkEntity::insert_many(models)
            .exec(&self.db)
            .await
            .map_err(map_db)?;
        Ok(())
    }

    pub async fn list_for_job(&self, download_job_id: Uuid) -> JobResult<Vec<download_chunk::Model>> {
        DownloadChunkEntity::find()
            .filter(download_chunk::Column::DownloadJobId.eq(download_job_id))
            .order_by_asc(download_chunk::Column::Ordinal)
            .all(&self.db)
            .await
            .map_err(map_db)
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        output_path: &str,
        feature_count: i64,
        byte_size: i64,
    ) -> JobResult<download_chunk::Model> {
        let current = DownloadChunkEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db)?
            .ok_or(JobError::NotFound(id))?;
        let mut model = current.into_active_model();
        model.status = Set(JobStatus::Completed);
        model.completed_at = Set(Some(Utc::now()));
        model.output_path = Set(Some(output_path.to_string()));
        model.feature_count = Set(feature_count);
        model.byte_size = Set(byte_size);
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> JobResult<download_chunk::Model> {
        let current = DownloadChunkEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db)?
            .ok_or(JobError::NotFound(id))?;
        let mut model = current.into_active_model();
        model.status = Set(JobStatus::Failed);
        model.completed_at = Set(Some(Utc::now()));
        model.error = Set(Some(error.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }
}

#[derive(Clone)]
pub struct ExportJobRepository {
    db: DatabaseConnection,
}

impl ExportJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        dataset_ids: Vec<Uuid>,
        output_format: &str,
        clip_polygon_wkt: Option<String>,
        expires_at: Option<chrono::DateTime<Utc>>,
        requested_by: Option<String>,
    ) -> JobResult<export_job::Model> {
        let model = export_job::ActiveModel {
            id: Set(Uuid::now_v7()),
            dataset_ids: Set(dataset_ids),
            status: Set(JobStatus::Pending),
            created_at: Set(Utc::now().into()),
            output_format: Set(output_format.to_string()),
            clip_polygon_wkt: Set(clip_polygon_wkt),
            expires_at: Set(expires_at),
            requested_by: Set(requested_by),
            retry_count: Set(0),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(map_db)
    }

    pub async fn find_by_id(&self, id: Uuid) -> JobResult<export_job::Model> {
        ExportJobEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db)?
            .ok_or(JobError::NotFound(id))
    }

    pub async fn mark_completed(&self, id: Uuid, output_key: &str) -> JobResult<export_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Completed);
        model.completed_at = Set(Some(Utc::now()));
        model.output_key = Set(Some(output_key.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> JobResult<export_job::Model> {
        let mut model = self.find_by_id(id).await?.into_active_model();
        model.status = Set(JobStatus::Failed);
        model.completed_at = Set(Some(Utc::now()));
        model.error = Set(Some(error.to_string()));
        model.update(&self.db).await.map_err(map_db)
    }

    /// Finds exports past their expiry for the (unspecified) janitor sweep
    /// to clean up.
    pub async fn find_expired(&self, now: chrono::DateTime<Utc>) -> JobResult<Vec<export_job::Model>> {
        ExportJobEntity::find()
            .filter(export_job::Column::ExpiresAt.lte(now))
            .filter(export_job::Column::Status.eq(JobStatus::Completed))
            .all(&self.db)
            .await
            .map_err(map_db)
    }
}
