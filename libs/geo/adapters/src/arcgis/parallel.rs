use super::client::ArcGisClient;
use super::paging::arcgis_feature_to_geojson;
use crate::error::{AdapterError, AdapterResult};
use crate::types::{DatasetRef, DownloadResult};
use crate::{CancelCheck, ProgressCallback};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Splits the OID range into `worker_count` contiguous chunks and fetches
/// them concurrently, then writes features back out in chunk order so the
/// resulting file is deterministic despite out-of-order completion.
pub async fn download_parallel(
    client: &ArcGisClient,
    dataset: &DatasetRef,
    out_path: &Path,
    worker_count: usize,
    progress: ProgressCallback<'_>,
    cancel: CancelCheck<'_>,
) -> AdapterResult<DownloadResult> {
    let oid_field = dataset
        .oid_field_name
        .as_deref()
        .ok_or_else(|| AdapterError::PolicyViolation("no oid field configured for parallel download".to_string()))?;

    let (min_oid, max_oid) = client.oid_range(&dataset.access_url, oid_field).await?;
    let worker_count = worker_count.max(1);
    let chunks = split_range(min_oid, max_oid, worker_count);

    if cancel() {
        return Err(AdapterError::Cancellation);
    }

    let mut results: Vec<(usize, Value)> = stream::iter(chunks.into_iter().enumerate())
        .map(|(idx, (lo, hi))| {
            let client = client.clone();
            let access_url = dataset.access_url.clone();
            let oid_field = oid_field.to_string();
            async move {
                let page = client.query_oid_range(&access_url, &oid_field, lo, hi).await;
                (idx, page)
            }
        })
        .buffer_unordered(worker_count)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|(idx, page)| page.map(|p| (idx, p)))
        .collect::<AdapterResult<Vec<_>>>()?;

    results.sort_by_key(|(idx, _)| *idx);

    let mut file = File::create(out_path).await.map_err(|e| {
        AdapterError::PermanentUpstream(format!("failed to create {}: {e}", out_path.display()))
    })?;
    file.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[").await?;

    let mut total_written: i64 = 0;
    let mut first_feature = true;
    for (_, page) in &results {
        if cancel() {
            return Err(AdapterError::Cancellation);
        }
        let geometry_type = page.get("geometryType").and_then(Value::as_str);
        let features = page.get("features").and_then(Value::as_array).cloned().unwrap_or_default();
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
    }

    file.write_all(b"]}").await?;
    file.flush().await?;

    Ok(DownloadResult {
        feature_count: total_written,
        bytes_written: file.metadata().await.map(|m| m.len()).unwrap_or(0),
    })
}

/// Downloads one OID range and writes it as a standalone GeoJSON
/// `FeatureCollection`, used by the single-chunk worker rather than the
/// fan-out-everything-at-once [`download_parallel`] path.
pub async fn download_oid_chunk(
    client: &ArcGisClient,
    dataset: &DatasetRef,
    min_oid: i64,
    max_oid: i64,
    out_path: &Path,
) -> AdapterResult<DownloadResult> {
    let oid_field = dataset
        .oid_field_name
        .as_deref()
        .ok_or_else(|| AdapterError::PolicyViolation("no oid field configured for chunked download".to_string()))?;

    let page = client
        .query_oid_range(&dataset.access_url, oid_field, min_oid, max_oid)
        .await?;
    let geometry_type = page.get("geometryType").and_then(Value::as_str);
    let features = page.get("features").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut file = File::create(out_path).await.map_err(|e| {
        AdapterError::PermanentUpstream(format!("failed to create {}: {e}", out_path.display()))
    })?;
    file.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[").await?;
    for (i, raw) in features.iter().enumerate() {
        if i > 0 {
            file.write_all(b",").await?;
        }
        let geojson_feature = arcgis_feature_to_geojson(raw, geometry_type);
        file.write_all(geojson_feature.to_string().as_bytes()).await?;
    }
    file.write_all(b"]}").await?;
    file.flush().await?;

    Ok(DownloadResult {
        feature_count: features.len() as i64,
        bytes_written: file.metadata().await.map(|m| m.len()).unwrap_or(0),
    })
}

/// Divides `[min_oid, max_oid]` into `worker_count` roughly-equal, inclusive,
/// non-overlapping ranges, in ascending order.
fn split_range(min_oid: i64, max_oid: i64, worker_count: usize) -> Vec<(i64, i64)> {
    if max_oid < min_oid {
        return vec![(min_oid, max_oid)];
    }
    let total = max_oid - min_oid + 1;
    let chunk_size = (total / worker_count as i64).max(1);

    let mut ranges = Vec::new();
    let mut start = min_oid;
    while start <= max_oid {
        let end = (start + chunk_size - 1).min(max_oid);
        ranges.push((start, end));
        start = end + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_evenly_divisible_range() {
        let ranges = split_range(0, 99, 4);
        assert_eq!(ranges, vec![(0, 24), (25, 49), (50, 74), (75, 99)]);
    }

    #[test]
    fn splits_uneven_range_without_gaps_or_overlap() {
        let ranges = split_range(0, 10, 3);
        let mut covered = std::collections::HashSet::new();
        for (lo, hi) in &ranges {
            for oid in *lo..=*hi {
                assert!(covered.insert(oid), "oid {oid} covered twice");
            }
        }
        assert_eq!(covered.len(), 11);
    }

    #[test]
    fn single_oid_range_yields_one_chunk() {
        assert_eq!(split_range(5, 5, 4), vec![(5, 5)]);
    }
}
