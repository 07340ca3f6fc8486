use crate::cancellation::CancellationCheck;
use crate::error::{StorageError, StorageResult};
use crate::{BoundingBox, ProgressCallback, StorageBackend, StoreOutcome};
use async_trait::async_trait;
use geo_catalog::dataset::StorageMode;
use geojson::FeatureReader;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const BATCH_SIZE: usize = 1000;

/// Stores one table per dataset (`cache_<hex32>`) in the application's
/// Postgres/PostGIS connection. Geometry is reprojected server-side from
/// whatever SRID the source GeoJSON carries (assumed EPSG:4326, per the
/// ingestion invariant) to EPSG:3857 for tile-friendly serving.
pub struct SpatialDbBackend {
    db: DatabaseConnection,
}

impl SpatialDbBackend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn table_name(dataset_id: Uuid) -> String {
        format!("cache_{}", dataset_id.simple())
    }

    async fn drop_table_if_exists(&self, table: &str) -> StorageResult<()> {
        let sql = format!(r#"DROP TABLE IF EXISTS "{table}""#);
        self.db
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(database::common::DatabaseError::from)?;
        Ok(())
    }

    async fn create_table(&self, table: &str) -> StorageResult<()> {
        let sql = format!(
            r#"
            CREATE TABLE "{table}" (
                id BIGSERIAL PRIMARY KEY,
                geom geometry(Geometry, 3857),
                properties JSONB
            )
            "#
        );
        self.db
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(database::common::DatabaseError::from)?;
        Ok(())
    }

    async fn create_spatial_index(&self, table: &str) -> StorageResult<()> {
        let sql = format!(r#"CREATE INDEX ON "{table}" USING GIST (geom)"#);
        self.db
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(database::common::DatabaseError::from)?;
        Ok(())
    }

    async fn insert_batch(
        &self,
        table: &str,
        batch: &[(serde_json::Value, serde_json::Value)],
    ) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await.map_err(database::common::DatabaseError::from)?;
        for (geometry, properties) in batch {
            let sql = format!(
                r#"INSERT INTO "{table}" (geom, properties)
                   VALUES (ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON($1), 4326), 3857), $2)"#
            );
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [geometry.to_string().into(), properties.clone().into()],
            ))
            .await
            .map_err(database::common::DatabaseError::from)?;
        }
        txn.commit().await.map_err(database::common::DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SpatialDbBackend {
    async fn store_dataset(
        &self,
        dataset_id: Uuid,
        geojson_path: &Path,
        cancellation: &dyn CancellationCheck,
        progress: ProgressCallback<'_>,
    ) -> StorageResult<StoreOutcome> {
        let table = Self::table_name(dataset_id);
        self.drop_table_if_exists(&table).await?;
        self.create_table(&table).await?;

        let file = BufReader::new(File::open(geojson_path)?);
        let reader = FeatureReader::from_reader(file);

        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut total: i64 = 0;

        for feature in reader.features() {
            let feature = feature?;
            let geometry = feature
                .geometry
                .as_ref()
                .map(|g| serde_json::to_value(g).unwrap_or(serde_json::Value::Null))
                .unwrap_or(serde_json::Value::Null);
            let properties = feature
                .properties
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);

            batch.push((geometry, properties));
            total += 1;

            if batch.len() >= BATCH_SIZE {
                self.insert_batch(&table, &batch).await?;
                batch.clear();
                progress(total, None);

                if cancellation.is_cancelled().await {
                    warn!(%dataset_id, table, "cancellation observed mid-store, dropping partial table");
                    self.drop_table_if_exists(&table).await?;
                    return Err(StorageError::Cancelled);
                }
            }
        }

        if total == 0 {
            self.drop_table_if_exists(&table).await?;
            return Err(StorageError::EmptyDataset);
        }

        if !batch.is_empty() {
            self.insert_batch(&table, &batch).await?;
            progress(total, Some(total));
        }

        self.create_spatial_index(&table).await?;
        info!(%dataset_id, table, total, "stored dataset in spatial db");

        Ok(StoreOutcome {
            storage_mode: StorageMode::SpatialDb,
            cache_table_name: Some(table),
            object_data_key: None,
            object_tile_key: None,
            feature_count: total,
            tile_built: false,
        })
    }

    async fn retrieve_dataset(
        &self,
        dataset_id: Uuid,
        bbox: Option<BoundingBox>,
    ) -> StorageResult<PathBuf> {
        let table = Self::table_name(dataset_id);

        let (where_clause, values): (String, Vec<sea_orm::Value>) = match bbox {
            Some(b) => (
                "WHERE ST_Intersects(geom, ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, 4326), 3857))"
                    .to_string(),
                vec![b.min_x.into(), b.min_y.into(), b.max_x.into(), b.max_y.into()],
            ),
            None => (String::new(), vec![]),
        };

        let sql = format!(
            r#"
            SELECT jsonb_build_object(
                'type', 'FeatureCollection',
                'features', coalesce(jsonb_agg(
                    jsonb_build_object(
                        'type', 'Feature',
                        'geometry', ST_AsGeoJSON(ST_Transform(geom, 4326))::jsonb,
                        'properties', properties
                    )
                ), '[]'::jsonb)
            ) AS collection
            FROM "{table}"
            {where_clause}
            "#
        );

        let row = self
            .db
            .query_one(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
            .await
            .map_err(database::common::DatabaseError::from)?;

        let collection: serde_json::Value = match row {
            Some(row) => row
                .try_get("", "collection")
                .unwrap_or(serde_json::json!({"type": "FeatureCollection", "features": []})),
            None => serde_json::json!({"type": "FeatureCollection", "features": []}),
        };

        let out_path = std::env::temp_dir().join(format!("{}-retrieve-{}.geojson", table, Uuid::now_v7()));
        let mut writer = BufWriter::new(File::create(&out_path)?);
        writer.write_all(collection.to_string().as_bytes())?;
        writer.flush()?;

        debug!(%dataset_id, path = %out_path.display(), "wrote retrieved GeoJSON");
        Ok(out_path)
    }
}
