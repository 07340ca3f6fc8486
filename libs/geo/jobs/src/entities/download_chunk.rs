use super::status::{ChunkStrategy, JobStatus};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "download_chunk")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub download_job_id: Uuid,
    pub ordinal: i32,
    pub strategy: ChunkStrategy,
    pub parameters: Option<Json>,
    pub status: JobStatus,
    pub output_path: Option<String>,
    pub feature_count: i64,
    pub byte_size: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::download_job::Entity",
        from = "Column::DownloadJobId",
        to = "super::download_job::Column::Id",
        on_delete = "Cascade"
    )]
    DownloadJob,
}

impl ActiveModelBehavior for ActiveModel {}
