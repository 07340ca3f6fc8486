use crate::cancellation::CancellationCheck;
use crate::error::{StorageError, StorageResult};
use crate::tile_generator::{adaptive_max_zoom, build_tiles, TileBuildConfig};
use crate::{BoundingBox, ProgressCallback, StorageBackend, StoreOutcome};
use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use geo_catalog::dataset::StorageMode;
use geojson::FeatureReader;
use core_config::object_storage::ObjectStorageConfig;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const WRITE_BATCH_SIZE: usize = 10_000;
const LARGE_DATASET_THRESHOLD: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PropertyType {
    Bool,
    Int,
    Float,
    String,
}

/// Columnar (GeoParquet-shaped) backend backed by an S3-compatible object
/// store. Writes `datasets/<id>/data.parquet` and, when tile generation is
/// enabled, `datasets/<id>/tiles.pmtiles`.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    tile_config: Option<TileBuildConfig>,
}

/// Builds an S3-compatible client from [`ObjectStorageConfig`]. Works
/// against AWS S3, MinIO, R2, and GCS's S3-compatibility mode, selected by
/// `endpoint` and `force_path_style`.
pub fn build_object_store(config: &ObjectStorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::new()
        .with_region(&config.region)
        .with_bucket_name(&config.bucket)
        .with_access_key_id(&config.access_key)
        .with_secret_access_key(&config.secret_key)
        .with_virtual_hosted_style_request(!config.force_path_style);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }

    let store = builder.build().map_err(StorageError::from)?;
    Ok(Arc::new(store))
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>, tile_config: Option<TileBuildConfig>) -> Self {
        Self { store, tile_config }
    }

    fn data_key(dataset_id: Uuid) -> ObjectPath {
        ObjectPath::from(format!("datasets/{dataset_id}/data.parquet"))
    }

    fn tile_key(dataset_id: Uuid) -> ObjectPath {
        ObjectPath::from(format!("datasets/{dataset_id}/tiles.pmtiles"))
    }

    /// Infers each property's column type from the first non-null value
    /// seen for that key. Subsequent null values stay null; a later value
    /// of a different type is coerced to the originally inferred type's
    /// textual form to keep the schema stable.
    fn infer_schema(properties: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, PropertyType> {
        let mut schema = BTreeMap::new();
        for (key, value) in properties {
            let inferred = match value {
                serde_json::Value::Bool(_) => Some(PropertyType::Bool),
                serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(PropertyType::Int),
                serde_json::Value::Number(_) => Some(PropertyType::Float),
                serde_json::Value::String(_) => Some(PropertyType::String),
                _ => None,
            };
            if let Some(inferred) = inferred {
                schema.entry(key.clone()).or_insert(inferred);
            }
        }
        schema
    }

    fn arrow_schema(property_schema: &BTreeMap<String, PropertyType>) -> Schema {
        let mut fields = vec![Field::new("geometry", DataType::Binary, false)];
        for (name, ty) in property_schema {
            let data_type = match ty {
                PropertyType::Bool => DataType::Boolean,
                PropertyType::Int => DataType::Int64,
                PropertyType::Float => DataType::Float64,
                PropertyType::String => DataType::Utf8,
            };
            fields.push(Field::new(name, data_type, true));
        }
        Schema::new(fields)
    }

    fn geo_metadata(
        property_schema: &BTreeMap<String, PropertyType>,
        bbox: Option<[f64; 4]>,
        geometry_types: &BTreeSet<&'static str>,
    ) -> String {
        let _ = property_schema;
        let bbox_json = bbox
            .map(|b| serde_json::json!([b[0], b[1], b[2], b[3]]))
            .unwrap_or(serde_json::Value::Null);
        let geometry_types: Vec<&str> = geometry_types.iter().copied().collect();

        serde_json::json!({
            "version": "1.0.0",
            "primary_column": "geometry",
            "columns": {
                "geometry": {
                    "encoding": "WKB",
                    "geometry_types": geometry_types,
                    "crs": {
                        "$schema": "https://proj.org/schemas/v0.7/projjson.schema.json",
                        "type": "GeographicCRS",
                        "name": "WGS 84",
                        "id": {"authority": "EPSG", "code": 4326}
                    },
                    "bbox": bbox_json
                }
            }
        })
        .to_string()
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn store_dataset(
        &self,
        dataset_id: Uuid,
        geojson_path: &Path,
        cancellation: &dyn CancellationCheck,
        progress: ProgressCallback<'_>,
    ) -> StorageResult<StoreOutcome> {
        let file = BufReader::new(File::open(geojson_path)?);
        let reader = FeatureReader::from_reader(file);

        let mut property_schema: Option<BTreeMap<String, PropertyType>> = None;
        let mut geometries: Vec<Vec<u8>> = Vec::with_capacity(WRITE_BATCH_SIZE);
        let mut properties_batch: Vec<serde_json::Map<String, serde_json::Value>> =
            Vec::with_capacity(WRITE_BATCH_SIZE);
        let mut batches: Vec<RecordBatch> = Vec::new();
        let mut total: i64 = 0;
        let mut bbox: Option<[f64; 4]> = None;
        let mut geometry_types: BTreeSet<&'static str> = BTreeSet::new();

        for feature in reader.features() {
            let feature = feature?;

            let geom_json = feature
                .geometry
                .as_ref()
                .map(|g| serde_json::to_value(g).unwrap_or(serde_json::Value::Null));
            let wkb = geom_json
                .as_ref()
                .and_then(|g| geojson_value_to_wkb(g))
                .unwrap_or_default();

            if let Some(geom) = &feature.geometry {
                geometry_types.insert(geojson_type_name(geom));
                if let Some(b) = geometry_bbox(geom) {
                    bbox = Some(match bbox {
                        Some(existing) => merge_bbox(existing, b),
                        None => b,
                    });
                }
            }

            let props = feature.properties.clone().unwrap_or_default();
            if property_schema.is_none() {
                property_schema = Some(Self::infer_schema(&props));
            }

            geometries.push(wkb);
            properties_batch.push(props);
            total += 1;

            // Large datasets amortize per-batch overhead (schema inference
            // lookups, RecordBatch construction) better with a wider batch;
            // small ones keep the default so progress/cancellation stay
            // responsive.
            let effective_batch_size = if total >= LARGE_DATASET_THRESHOLD as i64 {
                WRITE_BATCH_SIZE * 4
            } else {
                WRITE_BATCH_SIZE
            };

            if geometries.len() >= effective_batch_size {
                let schema = property_schema.clone().unwrap_or_default();
                batches.push(build_record_batch(&schema, &geometries, &properties_batch)?);
                geometries.clear();
                properties_batch.clear();
                progress(total, None);

                if cancellation.is_cancelled().await {
                    warn!(%dataset_id, "cancellation observed mid-store, discarding columnar write");
                    return Err(StorageError::Cancelled);
                }
            }
        }

        if total == 0 {
            return Err(StorageError::EmptyDataset);
        }

        if !geometries.is_empty() {
            let schema = property_schema.clone().unwrap_or_default();
            batches.push(build_record_batch(&schema, &geometries, &properties_batch)?);
        }

        let property_schema = property_schema.unwrap_or_default();
        let arrow_schema = Arc::new(Self::arrow_schema(&property_schema));
        let geo_meta = Self::geo_metadata(&property_schema, bbox, &geometry_types);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("geo".to_string(), geo_meta);
        let schema_with_meta = Arc::new(arrow_schema.as_ref().clone().with_metadata(metadata));

        let parquet_path = std::env::temp_dir().join(format!("{dataset_id}-data.parquet"));
        {
            let file = File::create(&parquet_path)?;
            let props = WriterProperties::builder().build();
            let mut writer = ArrowWriter::try_new(file, schema_with_meta, Some(props))?;
            for batch in &batches {
                writer.write(batch)?;
            }
            writer.close()?;
        }

        let data_key = Self::data_key(dataset_id);
        let bytes = tokio::fs::read(&parquet_path).await?;
        self.store.put(&data_key, Bytes::from(bytes).into()).await?;
        let _ = tokio::fs::remove_file(&parquet_path).await;

        let mut tile_key = None;
        let mut tile_built = false;
        if let Some(tile_config) = &self.tile_config {
            let mut config = tile_config.clone();
            config.max_zoom = adaptive_max_zoom(total);
            let tiles_path = std::env::temp_dir().join(format!("{dataset_id}-tiles.pmtiles"));
            match build_tiles(&config, dataset_id, geojson_path, &tiles_path).await {
                Ok(()) => {
                    let tiles_bytes = tokio::fs::read(&tiles_path).await?;
                    let key = Self::tile_key(dataset_id);
                    self.store.put(&key, Bytes::from(tiles_bytes).into()).await?;
                    let _ = tokio::fs::remove_file(&tiles_path).await;
                    tile_key = Some(key.to_string());
                    tile_built = true;
                }
                Err(e) => {
                    warn!(%dataset_id, error = %e, "tile generation failed, dataset is still served without tiles");
                }
            }
        }

        progress(total, Some(total));
        info!(%dataset_id, total, "stored dataset in object storage");

        Ok(StoreOutcome {
            storage_mode: StorageMode::Columnar,
            cache_table_name: None,
            object_data_key: Some(data_key.to_string()),
            object_tile_key: tile_key,
            feature_count: total,
            tile_built,
        })
    }

    async fn retrieve_dataset(
        &self,
        dataset_id: Uuid,
        bbox: Option<BoundingBox>,
    ) -> StorageResult<PathBuf> {
        let data_key = Self::data_key(dataset_id);
        let get_result = self.store.get(&data_key).await?;
        let bytes = get_result.bytes().await?;

        let out_path = std::env::temp_dir().join(format!("{dataset_id}-retrieve-{}.geojson", Uuid::now_v7()));
        let file = std::fs::File::create(&out_path)?;
        let mut writer = BufWriter::new(file);

        let reader = std::io::Cursor::new(bytes);
        let builder = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(reader)?;
        let parquet_reader = builder.build()?;

        writer.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[")?;
        let mut first = true;
        for batch in parquet_reader {
            let batch = batch?;
            for feature in record_batch_to_geojson_features(&batch, bbox) {
                if !first {
                    writer.write_all(b",")?;
                }
                first = false;
                writer.write_all(feature.to_string().as_bytes())?;
            }
        }
        writer.write_all(b"]}")?;
        writer.flush()?;

        Ok(out_path)
    }
}

fn build_record_batch(
    schema: &BTreeMap<String, PropertyType>,
    geometries: &[Vec<u8>],
    properties: &[serde_json::Map<String, serde_json::Value>],
) -> StorageResult<RecordBatch> {
    let mut geom_builder = BinaryBuilder::new();
    for g in geometries {
        geom_builder.append_value(g);
    }
    let mut columns: Vec<ArrayRef> = vec![Arc::new(geom_builder.finish())];

    for (key, ty) in schema {
        match ty {
            PropertyType::Bool => {
                let mut b = BooleanBuilder::new();
                for props in properties {
                    match props.get(key).and_then(|v| v.as_bool()) {
                        Some(v) => b.append_value(v),
                        None => b.append_null(),
                    }
                }
                columns.push(Arc::new(b.finish()));
            }
            PropertyType::Int => {
                let mut b = Int64Builder::new();
                for props in properties {
                    match props.get(key).and_then(|v| v.as_i64()) {
                        Some(v) => b.append_value(v),
                        None => b.append_null(),
                    }
                }
                columns.push(Arc::new(b.finish()));
            }
            PropertyType::Float => {
                let mut b = Float64Builder::new();
                for props in properties {
                    match props.get(key).and_then(|v| v.as_f64()) {
                        Some(v) => b.append_value(v),
                        None => b.append_null(),
                    }
                }
                columns.push(Arc::new(b.finish()));
            }
            PropertyType::String => {
                let mut b = StringBuilder::new();
                for props in properties {
                    match props.get(key).and_then(|v| v.as_str()) {
                        Some(v) => b.append_value(v),
                        None => b.append_null(),
                    }
                }
                columns.push(Arc::new(b.finish()));
            }
        }
    }

    let arrow_schema = Arc::new(super_arrow_schema(schema));
    Ok(RecordBatch::try_new(arrow_schema, columns)?)
}

fn super_arrow_schema(schema: &BTreeMap<String, PropertyType>) -> Schema {
    ObjectStoreBackend::arrow_schema(schema)
}

/// GeoParquet column metadata's `geometry_types` name, matching the variant
/// actually present on the feature rather than every kind this backend is
/// capable of encoding.
fn geojson_type_name(geometry: &geojson::Geometry) -> &'static str {
    use geojson::Value;
    match geometry.value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn geojson_value_to_wkb(value: &serde_json::Value) -> Option<Vec<u8>> {
    let geometry: geo_types::Geometry<f64> = geojson::Geometry::from_json_value(value.clone())
        .ok()?
        .try_into()
        .ok()?;
    wkb_encode(&geometry)
}

/// Minimal WKB (little-endian) encoder covering the geometry kinds produced
/// by provider adapters. Unsupported variants return `None` and are stored
/// as an empty geometry column rather than failing the whole batch.
fn wkb_encode(geometry: &geo_types::Geometry<f64>) -> Option<Vec<u8>> {
    use geo_types::Geometry;
    use std::io::Write as _;

    let mut buf = Vec::new();
    buf.push(1u8); // little-endian

    match geometry {
        Geometry::Point(p) => {
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.extend_from_slice(&p.x().to_le_bytes());
            buf.extend_from_slice(&p.y().to_le_bytes());
        }
        Geometry::LineString(ls) => {
            buf.extend_from_slice(&2u32.to_le_bytes());
            buf.extend_from_slice(&(ls.0.len() as u32).to_le_bytes());
            for c in &ls.0 {
                buf.extend_from_slice(&c.x.to_le_bytes());
                buf.extend_from_slice(&c.y.to_le_bytes());
            }
        }
        Geometry::Polygon(poly) => {
            buf.extend_from_slice(&3u32.to_le_bytes());
            let rings: Vec<&geo_types::LineString<f64>> =
                std::iter::once(poly.exterior()).chain(poly.interiors().iter()).collect();
            buf.extend_from_slice(&(rings.len() as u32).to_le_bytes());
            for ring in rings {
                buf.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
                for c in &ring.0 {
                    buf.extend_from_slice(&c.x.to_le_bytes());
                    buf.extend_from_slice(&c.y.to_le_bytes());
                }
            }
        }
        _ => return None,
    }

    let _ = buf.flush();
    Some(buf)
}

fn geometry_bbox(geojson_geom: &geojson::Geometry) -> Option<[f64; 4]> {
    let geometry: geo_types::Geometry<f64> = geojson_geom.clone().try_into().ok()?;
    geometry_extent(&geometry)
}

fn geometry_extent(geometry: &geo_types::Geometry<f64>) -> Option<[f64; 4]> {
    use geo_types::Geometry;

    let coords: Vec<(f64, f64)> = match geometry {
        Geometry::Point(p) => vec![(p.x(), p.y())],
        Geometry::LineString(ls) => ls.0.iter().map(|c| (c.x, c.y)).collect(),
        Geometry::Polygon(poly) => poly.exterior().0.iter().map(|c| (c.x, c.y)).collect(),
        _ => return None,
    };
    if coords.is_empty() {
        return None;
    }
    let mut bbox = [coords[0].0, coords[0].1, coords[0].0, coords[0].1];
    for (x, y) in &coords[1..] {
        bbox[0] = bbox[0].min(*x);
        bbox[1] = bbox[1].min(*y);
        bbox[2] = bbox[2].max(*x);
        bbox[3] = bbox[3].max(*y);
    }
    Some(bbox)
}

fn merge_bbox(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

/// Reverses [`wkb_encode`]: point/line-string/polygon only, matching what
/// the writer side actually produces.
fn wkb_decode(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.len() < 5 {
        return None;
    }
    let kind = u32::from_le_bytes(bytes[1..5].try_into().ok()?);
    let mut cursor = 5usize;

    let read_f64 = |buf: &[u8], at: usize| -> Option<f64> {
        Some(f64::from_le_bytes(buf.get(at..at + 8)?.try_into().ok()?))
    };

    match kind {
        1 => {
            let x = read_f64(bytes, cursor)?;
            let y = read_f64(bytes, cursor + 8)?;
            Some(serde_json::json!({"type": "Point", "coordinates": [x, y]}))
        }
        2 => {
            let count = u32::from_le_bytes(bytes.get(cursor..cursor + 4)?.try_into().ok()?) as usize;
            cursor += 4;
            let mut coords = Vec::with_capacity(count);
            for _ in 0..count {
                let x = read_f64(bytes, cursor)?;
                let y = read_f64(bytes, cursor + 8)?;
                coords.push(serde_json::json!([x, y]));
                cursor += 16;
            }
            Some(serde_json::json!({"type": "LineString", "coordinates": coords}))
        }
        3 => {
            let ring_count = u32::from_le_bytes(bytes.get(cursor..cursor + 4)?.try_into().ok()?) as usize;
            cursor += 4;
            let mut rings = Vec::with_capacity(ring_count);
            for _ in 0..ring_count {
                let point_count = u32::from_le_bytes(bytes.get(cursor..cursor + 4)?.try_into().ok()?) as usize;
                cursor += 4;
                let mut coords = Vec::with_capacity(point_count);
                for _ in 0..point_count {
                    let x = read_f64(bytes, cursor)?;
                    let y = read_f64(bytes, cursor + 8)?;
                    coords.push(serde_json::json!([x, y]));
                    cursor += 16;
                }
                rings.push(serde_json::Value::Array(coords));
            }
            Some(serde_json::json!({"type": "Polygon", "coordinates": rings}))
        }
        _ => None,
    }
}

fn geometry_matches_bbox(geometry: &serde_json::Value, bbox: BoundingBox) -> bool {
    let geojson_geom = match geojson::Geometry::from_json_value(geometry.clone()) {
        Ok(g) => g,
        Err(_) => return true,
    };
    let geo_geom: Result<geo_types::Geometry<f64>, _> = geojson_geom.try_into();
    let Ok(geo_geom) = geo_geom else { return true };
    let Some(extent) = geometry_extent(&geo_geom) else { return true };

    extent[0] <= bbox.max_x && extent[2] >= bbox.min_x && extent[1] <= bbox.max_y && extent[3] >= bbox.min_y
}

fn record_batch_to_geojson_features(
    batch: &RecordBatch,
    bbox: Option<BoundingBox>,
) -> Vec<serde_json::Value> {
    use arrow::array::{
        Array, BinaryArray, BooleanArray, Float64Array, Int64Array, StringArray,
    };

    let schema = batch.schema();
    let geom_col = batch
        .column_by_name("geometry")
        .and_then(|c| c.as_any().downcast_ref::<BinaryArray>());

    let Some(geom_col) = geom_col else { return Vec::new() };
    let mut features = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let geometry = if geom_col.is_null(row) {
            serde_json::Value::Null
        } else {
            wkb_decode(geom_col.value(row)).unwrap_or(serde_json::Value::Null)
        };

        if let Some(bbox) = bbox {
            if !geometry.is_null() && !geometry_matches_bbox(&geometry, bbox) {
                continue;
            }
        }

        let mut properties = serde_json::Map::new();
        for field in schema.fields() {
            if field.name() == "geometry" {
                continue;
            }
            let array = batch.column_by_name(field.name()).unwrap();
            if array.is_null(row) {
                continue;
            }
            let value = match field.data_type() {
                DataType::Boolean => array
                    .as_any()
                    .downcast_ref::<BooleanArray>()
                    .map(|a| serde_json::Value::Bool(a.value(row))),
                DataType::Int64 => array
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .map(|a| serde_json::json!(a.value(row))),
                DataType::Float64 => array
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .map(|a| serde_json::json!(a.value(row))),
                DataType::Utf8 => array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .map(|a| serde_json::Value::String(a.value(row).to_string())),
                _ => None,
            };
            if let Some(value) = value {
                properties.insert(field.name().clone(), value);
            }
        }

        features.push(serde_json::json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        }));
    }

    features
}
