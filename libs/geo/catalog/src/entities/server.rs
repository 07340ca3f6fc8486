use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, EnumIter, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "provider_kind")]
pub enum ProviderKind {
    #[sea_orm(string_value = "arcgis")]
    ArcGis,
    #[sea_orm(string_value = "wfs")]
    Wfs,
    #[sea_orm(string_value = "wcs")]
    Wcs,
    #[sea_orm(string_value = "ckan")]
    Ckan,
    #[sea_orm(string_value = "opendatasoft")]
    OpenDataSoft,
    #[sea_orm(string_value = "s3_listing")]
    S3Listing,
    #[sea_orm(string_value = "atom")]
    Atom,
    #[sea_orm(string_value = "direct")]
    Direct,
    #[sea_orm(string_value = "gee")]
    Gee,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, EnumIter, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "server_health")]
pub enum ServerHealth {
    #[sea_orm(string_value = "healthy")]
    Healthy,
    #[sea_orm(string_value = "degraded")]
    Degraded,
    #[sea_orm(string_value = "offline")]
    Offline,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "server")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    pub provider_kind: ProviderKind,
    pub auth_blob: Option<Json>,
    pub capabilities: Option<Json>,
    pub health: ServerHealth,
    pub crawl_cadence_hours: i32,
    pub rate_limit_blob: Option<Json>,
    pub connection_blob: Option<Json>,
    pub country_hint: Option<String>,
    pub dataset_count: i32,
    pub active_dataset_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::dataset::Entity")]
    Dataset,
}

impl Related<super::dataset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dataset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
