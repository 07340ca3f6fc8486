use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What an adapter claims to support, with sensible conservative defaults
/// used whenever a probe fails or a provider doesn't surface capabilities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub supports_pagination: bool,
    pub supports_oid_range_parallelism: bool,
    pub supports_etag: bool,
    pub supports_last_modified: bool,
    pub max_record_count: Option<u32>,
    pub oid_field_name: Option<String>,
    pub output_formats: Vec<String>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            supports_pagination: true,
            supports_oid_range_parallelism: true,
            supports_etag: false,
            supports_last_modified: false,
            max_record_count: Some(1000),
            oid_field_name: Some("OBJECTID".to_string()),
            output_formats: vec!["geojson".to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    Polygon,
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A dataset as discovered from an upstream catalog, before it is upserted
/// into the catalog store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub themes: BTreeSet<String>,
    pub bbox: Option<BoundingBox>,
    pub feature_count: Option<i64>,
    pub access_url: String,
    pub service_item_id: Option<String>,
    pub geometry_kind: GeometryKind,
    pub source_crs: Option<String>,
    pub upstream_page_limit: Option<u32>,
    pub upstream_last_edit: Option<DateTime<Utc>>,
    pub oid_field_name: Option<String>,
}

/// Cached, previously-recorded hints a `check_changed` call compares
/// against the current upstream state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CachedChangeHints {
    pub cached_etag: Option<String>,
    pub cached_last_modified: Option<String>,
    pub last_known_upstream_update: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeCheckMethod {
    ETag,
    LastModified,
    ProviderEditDate,
    WfsUpdateSeq,
    CkanModified,
    FeatureCount,
    SampleChecksum,
    MetadataHash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeCheckInfo {
    pub method: ChangeCheckMethod,
    pub changed: bool,
    pub conclusive: bool,
    pub details: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct DownloadResult {
    pub feature_count: i64,
    pub bytes_written: u64,
}

/// A reference to a specific remote dataset an adapter operates against;
/// just enough to issue requests without touching the catalog schema.
#[derive(Clone, Debug)]
pub struct DatasetRef {
    pub access_url: String,
    pub upstream_page_limit: Option<u32>,
    pub oid_field_name: Option<String>,
}
