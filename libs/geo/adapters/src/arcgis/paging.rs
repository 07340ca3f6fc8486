use super::client::ArcGisClient;
use crate::error::{AdapterError, AdapterResult};
use crate::types::{DatasetRef, DownloadResult};
use crate::{CancelCheck, ProgressCallback};
use serde_json::Value;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::warn;

const DEFAULT_PAGE_SIZE: u32 = 1000;
const MIN_PAGE_SIZE: u32 = 100;

/// Streams a dataset page by page into a GeoJSON `FeatureCollection` on
/// disk. A page size that keeps hitting transient failures is halved down
/// to [`MIN_PAGE_SIZE`] before giving up on that page.
pub async fn download_paged(
    client: &ArcGisClient,
    dataset: &DatasetRef,
    out_path: &Path,
    progress: ProgressCallback<'_>,
    cancel: CancelCheck<'_>,
) -> AdapterResult<DownloadResult> {
    let mut file = File::create(out_path).await.map_err(|e| {
        AdapterError::PermanentUpstream(format!("failed to create {}: {e}", out_path.display()))
    })?;
    file.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[").await?;

    let mut offset = 0u32;
    let mut page_size = dataset.upstream_page_limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let mut total_written: i64 = 0;
    let mut first_feature = true;

    loop {
        if cancel() {
            return Err(AdapterError::Cancellation);
        }

        let page = match client
            .query_page(&dataset.access_url, offset, page_size)
            .await
        {
            Ok(page) => page,
            Err(e) if e.is_retryable() && page_size > MIN_PAGE_SIZE => {
                page_size = (page_size / 2).max(MIN_PAGE_SIZE);
                warn!(new_page_size = page_size, "halving page size after transient failure");
                continue;
            }
            Err(e) => return Err(e),
        };

        let features = page
            .get("features")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if features.is_empty() {
            break;
        }

        let geometry_type = page.get("geometryType").and_then(Value::as_str);
        for raw in &features {
            let geojson_feature = arcgis_feature_to_geojson(raw, geometry_type);
            if !first_feature {
                file.write_all(b",").await?;
            }
            first_feature = false;
            file.write_all(geojson_feature.to_string().as_bytes()).await?;
        }

        total_written += features.len() as i64;
        progress(total_written, None);

        if (features.len() as u32) < page_size {
            break;
        }
        offset += page_size;
    }

    file.write_all(b"]}").await?;
    file.flush().await?;

    Ok(DownloadResult {
        feature_count: total_written,
        bytes_written: file.metadata().await.map(|m| m.len()).unwrap_or(0),
    })
}

/// Converts one ArcGIS JSON feature (`attributes` + Esri-shaped `geometry`)
/// into a GeoJSON `Feature` value.
pub fn arcgis_feature_to_geojson(feature: &Value, geometry_type: Option<&str>) -> Value {
    let properties = feature.get("attributes").cloned().unwrap_or(Value::Null);
    let geometry = feature
        .get("geometry")
        .and_then(|g| esri_geometry_to_geojson(g, geometry_type));

    serde_json::json!({
        "type": "Feature",
        "properties": properties,
        "geometry": geometry,
    })
}

fn esri_geometry_to_geojson(geometry: &Value, geometry_type: Option<&str>) -> Option<Value> {
    match geometry_type {
        Some("esriGeometryPoint") => {
            let x = geometry.get("x").and_then(Value::as_f64)?;
            let y = geometry.get("y").and_then(Value::as_f64)?;
            Some(serde_json::json!({"type": "Point", "coordinates": [x, y]}))
        }
        Some("esriGeometryPolyline") => {
            let paths = geometry.get("paths").and_then(Value::as_array)?;
            if paths.len() == 1 {
                Some(serde_json::json!({"type": "LineString", "coordinates": paths[0]}))
            } else {
                Some(serde_json::json!({"type": "MultiLineString", "coordinates": paths}))
            }
        }
        Some("esriGeometryPolygon") | Some("esriGeometryEnvelope") => {
            let rings = geometry.get("rings").and_then(Value::as_array)?;
            Some(serde_json::json!({"type": "Polygon", "coordinates": rings}))
        }
        _ => None,
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::PermanentUpstream(format!("io error writing download: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_point_feature() {
        let feature = serde_json::json!({
            "attributes": {"name": "example"},
            "geometry": {"x": 1.5, "y": 2.5},
        });
        let geojson = arcgis_feature_to_geojson(&feature, Some("esriGeometryPoint"));
        assert_eq!(geojson["geometry"]["type"], "Point");
        assert_eq!(geojson["geometry"]["coordinates"][0], 1.5);
        assert_eq!(geojson["properties"]["name"], "example");
    }

    #[test]
    fn converts_single_path_polyline_to_linestring() {
        let feature = serde_json::json!({
            "attributes": {},
            "geometry": {"paths": [[[0.0, 0.0], [1.0, 1.0]]]},
        });
        let geojson = arcgis_feature_to_geojson(&feature, Some("esriGeometryPolyline"));
        assert_eq!(geojson["geometry"]["type"], "LineString");
    }

    #[test]
    fn missing_geometry_type_yields_null_geometry() {
        let feature = serde_json::json!({"attributes": {}, "geometry": {"x": 1.0, "y": 2.0}});
        let geojson = arcgis_feature_to_geojson(&feature, None);
        assert!(geojson["geometry"].is_null());
    }
}
