use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, EnumIter, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "storage_mode")]
pub enum StorageMode {
    #[sea_orm(string_value = "spatial_db")]
    SpatialDb,
    #[sea_orm(string_value = "columnar")]
    Columnar,
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, EnumIter, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "download_strategy")]
pub enum DownloadStrategy {
    #[sea_orm(string_value = "simple")]
    Simple,
    #[sea_orm(string_value = "paged")]
    Paged,
    #[sea_orm(string_value = "chunked")]
    Chunked,
    #[sea_orm(string_value = "distributed")]
    Distributed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dataset")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub server_id: Uuid,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub themes: Vec<String>,
    pub bbox_min_x: Option<f64>,
    pub bbox_min_y: Option<f64>,
    pub bbox_max_x: Option<f64>,
    pub bbox_max_y: Option<f64>,
    pub feature_count: Option<i64>,
    pub access_url: String,

    pub service_item_id: Option<String>,
    pub geometry_kind: Option<String>,
    pub source_crs: Option<String>,
    pub upstream_page_limit: Option<i32>,
    pub upstream_last_edit: Option<DateTime<Utc>>,
    pub oid_field_name: Option<String>,

    pub cached_etag: Option<String>,
    pub cached_last_modified: Option<String>,
    pub last_known_upstream_update: Option<DateTime<Utc>>,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub change_pending: bool,

    pub is_cached: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub cache_table_name: Option<String>,
    pub object_data_key: Option<String>,
    pub object_tile_key: Option<String>,
    pub storage_mode: Option<StorageMode>,
    pub tile_built: bool,
    pub tile_size: Option<i64>,

    pub download_strategy: DownloadStrategy,

    pub license: Option<String>,
    pub attribution: Option<String>,
    pub active: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::server::Entity",
        from = "Column::ServerId",
        to = "super::server::Column::Id",
        on_delete = "Cascade"
    )]
    Server,
    #[sea_orm(has_many = "super::change_check::Entity")]
    ChangeCheck,
}

impl Related<super::server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Server.def()
    }
}

impl Related<super::change_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeCheck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the dataset's cache invariant (is_cached ⇔ a cache location
    /// is recorded and cached_at is set) holds. Used by repository writes to
    /// guard against committing an inconsistent row.
    pub fn cache_invariant_holds(&self) -> bool {
        let has_location = self.cache_table_name.is_some() || self.object_data_key.is_some();
        self.is_cached == (has_location && self.cached_at.is_some())
    }
}
