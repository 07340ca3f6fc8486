use super::status::JobStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "export_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub dataset_ids: Vec<Uuid>,
    pub status: JobStatus,
    pub created_at: DateTimeWithTimeZone,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub worker_task_id: Option<String>,
    pub output_format: String,
    pub clip_polygon_wkt: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub output_key: Option<String>,
    pub format_parameters: Option<Json>,
    pub requested_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
