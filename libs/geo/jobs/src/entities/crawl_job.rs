use super::status::JobStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crawl_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub server_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTimeWithTimeZone,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub worker_task_id: Option<String>,
    pub total_services: Option<i32>,
    pub services_processed: i32,
    pub datasets_discovered: i32,
    pub datasets_new: i32,
    pub datasets_updated: i32,
    pub current_stage: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "geo_catalog::server::Entity",
        from = "Column::ServerId",
        to = "geo_catalog::server::Column::Id",
        on_delete = "Cascade"
    )]
    Server,
}

impl ActiveModelBehavior for ActiveModel {}
