use super::status::JobStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "download_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTimeWithTimeZone,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub worker_task_id: Option<String>,
    pub strategy_label: String,
    pub total_chunks: i32,
    pub chunks_completed: i32,
    pub features_downloaded: i64,
    pub features_total: Option<i64>,
    pub current_stage: Option<String>,
    pub output_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "geo_catalog::dataset::Entity",
        from = "Column::DatasetId",
        to = "geo_catalog::dataset::Column::Id",
        on_delete = "Cascade"
    )]
    Dataset,
    #[sea_orm(has_many = "super::download_chunk::Entity")]
    DownloadChunk,
}

impl Related<super::download_chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DownloadChunk.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
