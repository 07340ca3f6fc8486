use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, EnumIter, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "change_check_method")]
pub enum ChangeCheckMethod {
    #[sea_orm(string_value = "etag")]
    ETag,
    #[sea_orm(string_value = "last_modified")]
    LastModified,
    #[sea_orm(string_value = "provider_edit_date")]
    ProviderEditDate,
    #[sea_orm(string_value = "wfs_update_seq")]
    WfsUpdateSeq,
    #[sea_orm(string_value = "ckan_modified")]
    CkanModified,
    #[sea_orm(string_value = "feature_count")]
    FeatureCount,
    #[sea_orm(string_value = "sample_checksum")]
    SampleChecksum,
    #[sea_orm(string_value = "metadata_hash")]
    MetadataHash,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "change_check")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub probe_time: DateTime<Utc>,
    pub method: ChangeCheckMethod,
    pub changed: bool,
    pub conclusive: bool,
    pub elapsed_ms: i64,
    pub triggered_download: bool,
    pub details: Option<Json>,
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dataset::Entity",
        from = "Column::DatasetId",
        to = "super::dataset::Column::Id",
        on_delete = "Cascade"
    )]
    Dataset,
}

impl Related<super::dataset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dataset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
