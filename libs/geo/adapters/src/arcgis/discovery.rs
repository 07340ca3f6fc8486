use super::client::ArcGisClient;
use crate::error::AdapterResult;
use crate::types::{BoundingBox, DatasetMetadata, GeometryKind};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

const WALKABLE_SERVICE_TYPES: [&str; 2] = ["FeatureServer", "MapServer"];
const MAX_CONCURRENT_SERVICES: usize = 10;
const MAX_KEYWORDS: usize = 10;

struct ServiceRef {
    base_url: String,
    name: String,
    kind: &'static str,
}

/// Walks a server's REST catalog root, then each folder one level deep,
/// then dispatches the discovered services in batches of up to
/// [`MAX_CONCURRENT_SERVICES`] concurrent `process_service` tasks. Layers
/// whose metadata can't be parsed are skipped with a warning; a whole
/// service is skipped the same way if its own describe call fails.
pub async fn discover_all(client: &ArcGisClient, root_url: &str) -> AdapterResult<Vec<DatasetMetadata>> {
    let root = root_url.to_string();

    let root_catalog = client.layer_metadata(&root).await?;
    let mut services = collect_service_refs(&root, &root_catalog);

    if let Some(folders) = root_catalog.get("folders").and_then(Value::as_array) {
        for folder in folders {
            let Some(name) = folder.as_str() else { continue };
            let folder_url = format!("{root}/{name}");
            match client.layer_metadata(&folder_url).await {
                Ok(folder_catalog) => services.extend(collect_service_refs(&folder_url, &folder_catalog)),
                Err(e) => warn!(folder = name, error = %e, "failed to list folder, skipping"),
            }
        }
    }

    let results: Vec<AdapterResult<Vec<DatasetMetadata>>> = stream::iter(services)
        .map(|svc| {
            let client = client.clone();
            async move { process_service(&client, &svc).await }
        })
        .buffer_unordered(MAX_CONCURRENT_SERVICES)
        .collect()
        .await;

    let mut datasets = Vec::new();
    for result in results {
        match result {
            Ok(mut items) => datasets.append(&mut items),
            Err(e) => warn!(error = %e, "failed to describe service, skipping"),
        }
    }
    Ok(datasets)
}

fn collect_service_refs(base_url: &str, catalog: &Value) -> Vec<ServiceRef> {
    let Some(services) = catalog.get("services").and_then(Value::as_array) else {
        return Vec::new();
    };

    services
        .iter()
        .filter_map(|service| {
            let name = service.get("name").and_then(Value::as_str)?;
            let kind = service.get("type").and_then(Value::as_str)?;
            let kind = WALKABLE_SERVICE_TYPES.iter().find(|&&k| k == kind)?;
            Some(ServiceRef {
                base_url: base_url.to_string(),
                name: name.to_string(),
                kind,
            })
        })
        .collect()
}

/// Describes one service and every one of its layers. Dataset upserts within
/// a single service are sequential by construction (this returns one `Vec`
/// built in layer order); concurrency lives at the service level in
/// [`discover_all`].
async fn process_service(client: &ArcGisClient, service: &ServiceRef) -> AdapterResult<Vec<DatasetMetadata>> {
    let service_url = format!("{}/{}/{}", service.base_url, service.name, service.kind);
    let service_meta = client.layer_metadata(&service_url).await?;

    let Some(layers) = service_meta.get("layers").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut datasets = Vec::with_capacity(layers.len());
    for layer in layers {
        let (Some(id), Some(stub_name)) = (
            layer.get("id").and_then(Value::as_i64),
            layer.get("name").and_then(Value::as_str),
        ) else {
            continue;
        };
        let access_url = format!("{service_url}/{id}");

        match dataset_from_layer(client, &service_url, &service.name, stub_name, &access_url, id).await {
            Ok(dataset) => datasets.push(dataset),
            Err(e) => warn!(layer = stub_name, error = %e, "failed to describe layer, skipping"),
        }
    }
    Ok(datasets)
}

/// Performs the per-layer `GET <access_url>?f=json` fetch and a
/// `returnCountOnly=true` count query, mirroring the two calls the original
/// crawler makes per layer rather than trusting the service-level stub
/// (which only carries `{id, name}`).
async fn dataset_from_layer(
    client: &ArcGisClient,
    service_url: &str,
    service_name: &str,
    stub_name: &str,
    access_url: &str,
    id: i64,
) -> AdapterResult<DatasetMetadata> {
    let layer = client.layer_metadata(access_url).await?;
    let feature_count = client.feature_count(access_url).await.ok();

    let layer_name = layer
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(stub_name);
    let description = layer
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(DatasetMetadata {
        external_id: format!("{service_url}#{id}"),
        name: format!("{service_name} \u{2212} {layer_name}"),
        keywords: description
            .as_deref()
            .map(keywords_from_description)
            .unwrap_or_default(),
        description,
        themes: BTreeSet::new(),
        bbox: layer.get("extent").and_then(parse_extent),
        feature_count,
        access_url: access_url.to_string(),
        service_item_id: layer
            .get("serviceItemId")
            .and_then(Value::as_str)
            .map(str::to_string),
        geometry_kind: layer
            .get("geometryType")
            .and_then(Value::as_str)
            .map(parse_geometry_type)
            .unwrap_or(GeometryKind::Unknown),
        source_crs: layer
            .get("extent")
            .and_then(|e| e.get("spatialReference"))
            .and_then(|sr| sr.get("wkid"))
            .and_then(Value::as_i64)
            .map(|wkid| wkid.to_string()),
        upstream_page_limit: layer.get("maxRecordCount").and_then(Value::as_u64).map(|n| n as u32),
        upstream_last_edit: layer
            .get("editingInfo")
            .and_then(|e| e.get("lastEditDate"))
            .and_then(Value::as_i64)
            .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms)),
        oid_field_name: oid_field_name(&layer),
    })
}

/// First ten whitespace-separated tokens of a layer's description.
fn keywords_from_description(description: &str) -> Vec<String> {
    description
        .split_whitespace()
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

fn oid_field_name(layer: &Value) -> Option<String> {
    layer
        .get("fields")
        .and_then(Value::as_array)?
        .iter()
        .find(|f| f.get("type").and_then(Value::as_str) == Some("esriFieldTypeOID"))
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_extent(extent: &Value) -> Option<BoundingBox> {
    Some(BoundingBox {
        min_x: extent.get("xmin").and_then(Value::as_f64)?,
        min_y: extent.get("ymin").and_then(Value::as_f64)?,
        max_x: extent.get("xmax").and_then(Value::as_f64)?,
        max_y: extent.get("ymax").and_then(Value::as_f64)?,
    })
}

fn parse_geometry_type(geometry_type: &str) -> GeometryKind {
    match geometry_type {
        "esriGeometryPoint" => GeometryKind::Point,
        "esriGeometryMultipoint" => GeometryKind::MultiPoint,
        "esriGeometryPolyline" => GeometryKind::LineString,
        "esriGeometryPolygon" | "esriGeometryEnvelope" => GeometryKind::Polygon,
        _ => GeometryKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_esri_geometry_types() {
        assert_eq!(parse_geometry_type("esriGeometryPoint"), GeometryKind::Point);
        assert_eq!(parse_geometry_type("esriGeometryPolygon"), GeometryKind::Polygon);
        assert_eq!(parse_geometry_type("esriGeometryWeird"), GeometryKind::Unknown);
    }

    #[test]
    fn parses_extent_into_bbox() {
        let extent = serde_json::json!({"xmin": 1.0, "ymin": 2.0, "xmax": 3.0, "ymax": 4.0});
        let bbox = parse_extent(&extent).unwrap();
        assert_eq!(bbox.min_x, 1.0);
        assert_eq!(bbox.max_y, 4.0);
    }

    #[test]
    fn keywords_take_first_ten_whitespace_tokens() {
        let description = "one two three four five six seven eight nine ten eleven twelve";
        let keywords = keywords_from_description(description);
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(keywords.last().unwrap(), "ten");
    }

    #[test]
    fn oid_field_name_finds_the_esri_oid_field() {
        let layer = serde_json::json!({
            "fields": [
                {"name": "Shape", "type": "esriFieldTypeGeometry"},
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
            ]
        });
        assert_eq!(oid_field_name(&layer).as_deref(), Some("OBJECTID"));
    }

    #[test]
    fn oid_field_name_absent_without_fields() {
        let layer = serde_json::json!({"id": 0, "name": "roads"});
        assert_eq!(oid_field_name(&layer), None);
    }

    #[test]
    fn collect_service_refs_filters_non_walkable_types() {
        let catalog = serde_json::json!({
            "services": [
                {"name": "roads", "type": "FeatureServer"},
                {"name": "imagery", "type": "ImageServer"},
            ]
        });
        let refs = collect_service_refs("https://example.test", &catalog);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "roads");
    }
}
