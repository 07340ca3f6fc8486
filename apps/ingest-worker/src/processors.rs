//! Stream processors for the four job kinds this worker drains: catalog
//! crawls, dataset downloads, per-chunk downloads, and exports.
//!
//! Each processor mirrors the same shape: an `Arc`-wrapped bundle of
//! repositories/adapters, a handful of inherent per-stage methods, and a
//! thin `StreamProcessor` impl that dispatches into them. Cross-crate
//! errors are folded into `StreamError::Processing` via `crate::error`
//! rather than `?`, since neither side of the conversion is local to this
//! crate.

use crate::error::{adapter_err, catalog_err, job_err, storage_err};
use async_trait::async_trait;
use futures::StreamExt;
use geo_adapters::{AdapterRegistry, DatasetRef, DownloadStrategyChoice, select_download_strategy};
use geo_catalog::dataset::{self, DownloadStrategy, StorageMode};
use geo_catalog::server::ProviderKind;
use geo_catalog::theme_classifier;
use geo_catalog::{DatasetRepository, ServerRepository};
use geo_jobs::{
    CrawlJobMessage, CrawlJobRepository, DownloadChunkMessage, DownloadChunkRepository,
    DownloadJobMessage, DownloadJobRepository, ExportJobMessage, ExportJobRepository,
};
use geo_storage::hybrid::BackendChoice;
use geo_storage::{BoundingBox as StorageBoundingBox, HybridStorageRouter, JobCancellation};
use bytes::Bytes;
use object_store::{path::Path as ObjectPath, ObjectStore};
use sea_orm::ActiveValue::Set;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{StreamError, StreamProcessor};
use tracing::{error, info, warn};
use uuid::Uuid;

const WORKER_TASK_ID: &str = "ingest-worker";
const CANCEL_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// ArcGIS services overwhelmingly expose their OID field as `OBJECTID`;
/// used when discovery couldn't read a real field name off the layer.
const DEFAULT_OID_FIELD_NAME: &str = "OBJECTID";

fn oid_field_name_or_default(recorded: Option<&String>) -> Option<String> {
    Some(recorded.cloned().unwrap_or_else(|| DEFAULT_OID_FIELD_NAME.to_string()))
}

fn provider_kind_key(kind: &ProviderKind) -> &'static str {
    match kind {
        ProviderKind::ArcGis => "arcgis",
        ProviderKind::Wfs => "wfs",
        ProviderKind::Wcs => "wcs",
        ProviderKind::Ckan => "ckan",
        ProviderKind::OpenDataSoft => "opendatasoft",
        ProviderKind::S3Listing => "s3_listing",
        ProviderKind::Atom => "atom",
        ProviderKind::Direct => "direct",
        ProviderKind::Gee => "gee",
    }
}

fn unsupported_provider(kind: &ProviderKind) -> StreamError {
    StreamError::Processing(format!("no adapter registered for provider kind {kind:?}"))
}

fn download_staging_path(job_id: Uuid) -> PathBuf {
    std::env::temp_dir().join(format!("ingest-download-{job_id}.geojson"))
}

fn chunk_staging_path(download_job_id: Uuid, chunk_id: Uuid) -> PathBuf {
    std::env::temp_dir().join(format!("ingest-chunk-{download_job_id}-{chunk_id}.geojson"))
}

/// Spawns a background poller that flips an `AtomicBool` once a download
/// job's row is marked cancelled, so adapters (which take a synchronous
/// cancel check) can observe cancellation without awaiting mid-download.
fn spawn_cancellation_poller(
    repo: DownloadJobRepository,
    job_id: Uuid,
) -> (Arc<AtomicBool>, tokio::task::JoinHandle<()>) {
    let flag = Arc::new(AtomicBool::new(false));
    let poll_flag = flag.clone();
    let handle = tokio::spawn(async move {
        loop {
            tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
            match repo.is_cancelled(job_id).await {
                Ok(true) => {
                    poll_flag.store(true, Ordering::Relaxed);
                    break;
                }
                Ok(false) => {}
                Err(e) => warn!(job_id = %job_id, error = %e, "cancellation poll failed, retrying"),
            }
        }
    });
    (flag, handle)
}

fn download_strategy_for(choice: DownloadStrategyChoice) -> DownloadStrategy {
    match choice {
        DownloadStrategyChoice::Paged => DownloadStrategy::Paged,
        DownloadStrategyChoice::Parallel => DownloadStrategy::Chunked,
    }
}

/// Builds (or updates) a dataset row from freshly discovered metadata.
fn build_dataset_active_model(
    server_id: Uuid,
    meta: &geo_adapters::DatasetMetadata,
    themes: Vec<String>,
    strategy: DownloadStrategy,
    existing: Option<&dataset::Model>,
) -> dataset::ActiveModel {
    let now = chrono::Utc::now();
    let geometry_kind = format!("{:?}", meta.geometry_kind).to_lowercase();

    dataset::ActiveModel {
        id: Set(existing.map(|m| m.id).unwrap_or_else(Uuid::now_v7)),
        server_id: Set(server_id),
        external_id: Set(meta.external_id.clone()),
        name: Set(meta.name.clone()),
        description: Set(meta.description.clone()),
        keywords: Set(meta.keywords.clone()),
        themes: Set(themes),
        bbox_min_x: Set(meta.bbox.as_ref().map(|b| b.min_x)),
        bbox_min_y: Set(meta.bbox.as_ref().map(|b| b.min_y)),
        bbox_max_x: Set(meta.bbox.as_ref().map(|b| b.max_x)),
        bbox_max_y: Set(meta.bbox.as_ref().map(|b| b.max_y)),
        feature_count: Set(meta.feature_count),
        access_url: Set(meta.access_url.clone()),
        service_item_id: Set(meta.service_item_id.clone()),
        geometry_kind: Set(Some(geometry_kind)),
        source_crs: Set(meta.source_crs.clone()),
        upstream_page_limit: Set(meta.upstream_page_limit.map(|n| n as i32)),
        upstream_last_edit: Set(meta.upstream_last_edit),
        oid_field_name: Set(meta.oid_field_name.clone()),
        last_probe_at: Set(Some(now)),
        change_pending: Set(existing.map(|m| m.change_pending).unwrap_or(false)),
        download_strategy: Set(strategy),
        active: Set(true),
        created_at: existing
            .map(|m| Set(m.created_at))
            .unwrap_or_else(|| Set(now.into())),
        updated_at: Set(now.into()),
        ..Default::default()
    }
}

#[derive(Clone)]
pub struct CrawlProcessor {
    server_repo: ServerRepository,
    dataset_repo: DatasetRepository,
    crawl_repo: CrawlJobRepository,
    registry: Arc<AdapterRegistry>,
}

impl CrawlProcessor {
    pub fn new(
        server_repo: ServerRepository,
        dataset_repo: DatasetRepository,
        crawl_repo: CrawlJobRepository,
        registry: Arc<AdapterRegistry>,
    ) -> Self {
        Self {
            server_repo,
            dataset_repo,
            crawl_repo,
            registry,
        }
    }

    async fn run_crawl(&self, msg: &CrawlJobMessage) -> Result<(), StreamError> {
        self.crawl_repo
            .mark_running(msg.job_id, WORKER_TASK_ID)
            .await
            .map_err(job_err)?;

        let server = self
            .server_repo
            .find_by_id(msg.server_id)
            .await
            .map_err(catalog_err)?;

        let adapter = self
            .registry
            .get(provider_kind_key(&server.provider_kind))
            .ok_or_else(|| unsupported_provider(&server.provider_kind))?;

        let capabilities = adapter.probe_capabilities(&server.base_url).await;

        let mut stream = adapter.discover_datasets(&server.base_url);
        let (mut discovered, mut new_count, mut updated_count) = (0i32, 0i32, 0i32);

        while let Some(item) = stream.next().await {
            let meta = match item {
                Ok(meta) => meta,
                Err(e) => {
                    error!(server_id = %msg.server_id, error = %e, "crawl aborted: catalog root unreachable");
                    self.crawl_repo
                        .mark_failed(msg.job_id, &e.to_string())
                        .await
                        .map_err(job_err)?;
                    return Err(adapter_err(e));
                }
            };

            let themes: Vec<String> = theme_classifier::classify(&meta.name, meta.description.as_deref())
                .into_iter()
                .map(str::to_string)
                .collect();
            let strategy = download_strategy_for(select_download_strategy(meta.feature_count, &capabilities));

            let (_, is_new) = self
                .dataset_repo
                .upsert_by_access_url(server.id, &meta.access_url, |existing| {
                    build_dataset_active_model(server.id, &meta, themes.clone(), strategy, existing)
                })
                .await
                .map_err(catalog_err)?;

            discovered += 1;
            if is_new {
                new_count += 1;
            } else {
                updated_count += 1;
            }

            if discovered % 25 == 0 {
                self.crawl_repo
                    .update_progress(msg.job_id, discovered, discovered, new_count, updated_count, "discovering")
                    .await
                    .map_err(job_err)?;
            }
        }

        self.crawl_repo
            .update_progress(msg.job_id, discovered, discovered, new_count, updated_count, "finalizing")
            .await
            .map_err(job_err)?;
        self.crawl_repo
            .mark_completed(msg.job_id, discovered)
            .await
            .map_err(job_err)?;

        info!(
            server_id = %msg.server_id, job_id = %msg.job_id,
            discovered, new_count, updated_count,
            "crawl completed"
        );
        Ok(())
    }
}

#[async_trait]
impl StreamProcessor<CrawlJobMessage> for CrawlProcessor {
    async fn process(&self, job: &CrawlJobMessage) -> Result<(), StreamError> {
        self.run_crawl(job).await
    }

    fn name(&self) -> &'static str {
        "crawl-processor"
    }
}

#[derive(Clone)]
pub struct DownloadProcessor {
    dataset_repo: DatasetRepository,
    server_repo: ServerRepository,
    download_repo: DownloadJobRepository,
    registry: Arc<AdapterRegistry>,
    storage: Arc<HybridStorageRouter>,
}

impl DownloadProcessor {
    pub fn new(
        dataset_repo: DatasetRepository,
        server_repo: ServerRepository,
        download_repo: DownloadJobRepository,
        registry: Arc<AdapterRegistry>,
        storage: Arc<HybridStorageRouter>,
    ) -> Self {
        Self {
            dataset_repo,
            server_repo,
            download_repo,
            registry,
            storage,
        }
    }

    async fn run_download(&self, msg: &DownloadJobMessage) -> Result<(), StreamError> {
        self.download_repo
            .mark_running(msg.job_id, WORKER_TASK_ID)
            .await
            .map_err(job_err)?;

        let dataset = self
            .dataset_repo
            .find_by_id(msg.dataset_id)
            .await
            .map_err(catalog_err)?;
        let server = self
            .server_repo
            .find_by_id(dataset.server_id)
            .await
            .map_err(catalog_err)?;
        let adapter = self
            .registry
            .get(provider_kind_key(&server.provider_kind))
            .ok_or_else(|| unsupported_provider(&server.provider_kind))?;

        let dataset_ref = DatasetRef {
            access_url: dataset.access_url.clone(),
            upstream_page_limit: dataset.upstream_page_limit.map(|n| n as u32),
            oid_field_name: oid_field_name_or_default(dataset.oid_field_name.as_ref()),
        };

        let out_path = download_staging_path(msg.job_id);
        let (cancel_flag, poller) = spawn_cancellation_poller(self.download_repo.clone(), msg.job_id);
        let download_repo = self.download_repo.clone();
        let job_id = msg.job_id;
        let progress = move |downloaded: i64, total: Option<i64>| {
            let repo = download_repo.clone();
            tokio::spawn(async move {
                if let Err(e) = repo.update_progress(job_id, downloaded, total).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist download progress");
                }
            });
        };
        let cancel_check = cancel_flag.clone();
        let cancel = move || cancel_check.load(Ordering::Relaxed);

        self.download_repo
            .update_stage(msg.job_id, "downloading")
            .await
            .map_err(job_err)?;

        let download_result = match dataset.download_strategy {
            DownloadStrategy::Simple => adapter.download_simple(&dataset_ref, &out_path).await,
            DownloadStrategy::Paged => {
                adapter
                    .download_paged(&dataset_ref, &out_path, &progress, &cancel)
                    .await
            }
            DownloadStrategy::Chunked | DownloadStrategy::Distributed => {
                let workers = 4usize;
                adapter
                    .download_parallel(&dataset_ref, &out_path, workers, &progress, &cancel)
                    .await
            }
        };
        poller.abort();

        let download_result = match download_result {
            Ok(r) => r,
            Err(e) => {
                self.download_repo
                    .mark_failed(msg.job_id, &e.to_string())
                    .await
                    .map_err(job_err)?;
                return Err(adapter_err(e));
            }
        };

        self.download_repo
            .update_stage(msg.job_id, "storing")
            .await
            .map_err(job_err)?;

        let cancellation = JobCancellation::new(self.download_repo.clone(), msg.job_id);
        let store_progress = |_written: i64, _total: Option<i64>| {};
        let outcome = self
            .storage
            .store_dataset(
                dataset.id,
                &out_path,
                Some(download_result.feature_count),
                &dataset.download_strategy,
                &cancellation,
                &store_progress,
            )
            .await;
        let _ = tokio::fs::remove_file(&out_path).await;

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                self.download_repo
                    .mark_failed(msg.job_id, &e.to_string())
                    .await
                    .map_err(job_err)?;
                return Err(storage_err(e));
            }
        };

        let mut active = dataset.clone().into_active_model_for_cache(&outcome);
        active.updated_at = Set(chrono::Utc::now().into());
        self.dataset_repo.update(active).await.map_err(catalog_err)?;

        let output_path = outcome
            .object_data_key
            .or(outcome.cache_table_name)
            .unwrap_or_else(|| out_path.display().to_string());
        self.download_repo
            .mark_completed(msg.job_id, &output_path)
            .await
            .map_err(job_err)?;

        info!(job_id = %msg.job_id, dataset_id = %msg.dataset_id, features = outcome.feature_count, "download completed");
        Ok(())
    }
}

#[async_trait]
impl StreamProcessor<DownloadJobMessage> for DownloadProcessor {
    async fn process(&self, job: &DownloadJobMessage) -> Result<(), StreamError> {
        self.run_download(job).await
    }

    fn name(&self) -> &'static str {
        "download-processor"
    }
}

trait DatasetCacheUpdate {
    fn into_active_model_for_cache(self, outcome: &geo_storage::StoreOutcome) -> dataset::ActiveModel;
}

impl DatasetCacheUpdate for dataset::Model {
    fn into_active_model_for_cache(self, outcome: &geo_storage::StoreOutcome) -> dataset::ActiveModel {
        use sea_orm::IntoActiveModel;
        let mut active = self.into_active_model();
        active.is_cached = Set(true);
        active.cached_at = Set(Some(chrono::Utc::now()));
        active.cache_table_name = Set(outcome.cache_table_name.clone());
        active.object_data_key = Set(outcome.object_data_key.clone());
        active.object_tile_key = Set(outcome.object_tile_key.clone());
        active.storage_mode = Set(Some(outcome.storage_mode.clone()));
        active.tile_built = Set(outcome.tile_built);
        active.feature_count = Set(Some(outcome.feature_count));
        active
    }
}

#[derive(Clone)]
pub struct ChunkProcessor {
    dataset_repo: DatasetRepository,
    server_repo: ServerRepository,
    download_repo: DownloadJobRepository,
    chunk_repo: DownloadChunkRepository,
    registry: Arc<AdapterRegistry>,
    storage: Arc<HybridStorageRouter>,
}

impl ChunkProcessor {
    pub fn new(
        dataset_repo: DatasetRepository,
        server_repo: ServerRepository,
        download_repo: DownloadJobRepository,
        chunk_repo: DownloadChunkRepository,
        registry: Arc<AdapterRegistry>,
        storage: Arc<HybridStorageRouter>,
    ) -> Self {
        Self {
            dataset_repo,
            server_repo,
            download_repo,
            chunk_repo,
            registry,
            storage,
        }
    }

    async fn run_chunk(&self, msg: &DownloadChunkMessage) -> Result<(), StreamError> {
        let chunks = self
            .chunk_repo
            .list_for_job(msg.download_job_id)
            .await
            .map_err(job_err)?;
        let chunk = chunks
            .into_iter()
            .find(|c| c.id == msg.chunk_id)
            .ok_or_else(|| StreamError::Processing(format!("chunk {} not found", msg.chunk_id)))?;

        let download_job = self
            .download_repo
            .find_by_id(msg.download_job_id)
            .await
            .map_err(job_err)?;
        let dataset = self
            .dataset_repo
            .find_by_id(download_job.dataset_id)
            .await
            .map_err(catalog_err)?;
        let server = self
            .server_repo
            .find_by_id(dataset.server_id)
            .await
            .map_err(catalog_err)?;
        let adapter = self
            .registry
            .get(provider_kind_key(&server.provider_kind))
            .ok_or_else(|| unsupported_provider(&server.provider_kind))?;

        let (min_oid, max_oid) = chunk
            .parameters
            .as_ref()
            .and_then(|p| Some((p.get("min_oid")?.as_i64()?, p.get("max_oid")?.as_i64()?)))
            .ok_or_else(|| StreamError::Processing(format!("chunk {} missing oid range parameters", chunk.id)))?;

        let dataset_ref = DatasetRef {
            access_url: dataset.access_url.clone(),
            upstream_page_limit: dataset.upstream_page_limit.map(|n| n as u32),
            oid_field_name: oid_field_name_or_default(dataset.oid_field_name.as_ref()),
        };
        let out_path = chunk_staging_path(msg.download_job_id, msg.chunk_id);

        let result = adapter.download_oid_chunk(&dataset_ref, min_oid, max_oid, &out_path).await;
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                self.chunk_repo
                    .mark_failed(chunk.id, &e.to_string())
                    .await
                    .map_err(job_err)?;
                return Err(adapter_err(e));
            }
        };

        let byte_size = tokio::fs::metadata(&out_path).await.map(|m| m.len() as i64).unwrap_or(0);
        self.chunk_repo
            .mark_completed(chunk.id, &out_path.display().to_string(), result.feature_count, byte_size)
            .await
            .map_err(job_err)?;

        let updated_job = self
            .download_repo
            .increment_chunks_completed(msg.download_job_id)
            .await
            .map_err(job_err)?;

        if updated_job.chunks_completed >= updated_job.total_chunks {
            self.merge_and_store(&dataset, &updated_job).await?;
        }

        Ok(())
    }

    /// Runs once, triggered by whichever chunk happens to complete the set:
    /// concatenates every completed chunk's staged GeoJSON into one file,
    /// hands it to the storage router, and marks the parent download job
    /// completed.
    async fn merge_and_store(
        &self,
        dataset: &dataset::Model,
        download_job: &geo_jobs::entities::download_job::Model,
    ) -> Result<(), StreamError> {
        let chunks = self
            .chunk_repo
            .list_for_job(download_job.id)
            .await
            .map_err(job_err)?;
        let chunk_paths: Vec<PathBuf> = chunks
            .iter()
            .filter_map(|c| c.output_path.as_ref().map(PathBuf::from))
            .collect();

        let merged_path = download_staging_path(download_job.id);
        merge_geojson_files(&chunk_paths, &merged_path).map_err(storage_err)?;

        let total_features: i64 = chunks.iter().map(|c| c.feature_count).sum();
        let cancellation = JobCancellation::new(self.download_repo.clone(), download_job.id);
        let no_op_progress = |_written: i64, _total: Option<i64>| {};
        let outcome = self
            .storage
            .store_dataset(
                dataset.id,
                &merged_path,
                Some(total_features),
                &dataset.download_strategy,
                &cancellation,
                &no_op_progress,
            )
            .await;

        for path in &chunk_paths {
            let _ = tokio::fs::remove_file(path).await;
        }
        let _ = tokio::fs::remove_file(&merged_path).await;

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                self.download_repo
                    .mark_failed(download_job.id, &e.to_string())
                    .await
                    .map_err(job_err)?;
                return Err(storage_err(e));
            }
        };

        let mut active = dataset.clone().into_active_model_for_cache(&outcome);
        active.updated_at = Set(chrono::Utc::now().into());
        self.dataset_repo.update(active).await.map_err(catalog_err)?;

        let output_path = outcome
            .object_data_key
            .or(outcome.cache_table_name)
            .unwrap_or_else(|| merged_path.display().to_string());
        self.download_repo
            .mark_completed(download_job.id, &output_path)
            .await
            .map_err(job_err)?;

        info!(download_job_id = %download_job.id, features = total_features, "chunked download merged and stored");
        Ok(())
    }
}

#[async_trait]
impl StreamProcessor<DownloadChunkMessage> for ChunkProcessor {
    async fn process(&self, job: &DownloadChunkMessage) -> Result<(), StreamError> {
        self.run_chunk(job).await
    }

    fn name(&self) -> &'static str {
        "chunk-processor"
    }
}

/// Streams features out of each chunk file in turn and writes them into one
/// combined `FeatureCollection`, so the merge never holds more than one
/// chunk's features in memory at a time.
fn merge_geojson_files(chunk_paths: &[PathBuf], out_path: &std::path::Path) -> geo_storage::StorageResult<()> {
    use geojson::FeatureReader;
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Write};

    let mut writer = BufWriter::new(File::create(out_path)?);
    writer.write_all(br#"{"type":"FeatureCollection","features":["#)?;

    let mut wrote_any = false;
    for path in chunk_paths {
        let file = BufReader::new(File::open(path)?);
        let reader = FeatureReader::from_reader(file);
        for feature in reader.features() {
            let feature = feature?;
            if wrote_any {
                writer.write_all(b",")?;
            }
            writer.write_all(serde_json::to_string(&feature).unwrap_or_default().as_bytes())?;
            wrote_any = true;
        }
    }

    writer.write_all(b"]}")?;
    writer.flush()?;
    Ok(())
}

#[derive(Clone)]
pub struct ExportProcessor {
    dataset_repo: DatasetRepository,
    export_repo: ExportJobRepository,
    storage: Arc<HybridStorageRouter>,
    object_store: Arc<dyn ObjectStore>,
}

impl ExportProcessor {
    pub fn new(
        dataset_repo: DatasetRepository,
        export_repo: ExportJobRepository,
        storage: Arc<HybridStorageRouter>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            dataset_repo,
            export_repo,
            storage,
            object_store,
        }
    }

    async fn run_export(&self, msg: &ExportJobMessage) -> Result<(), StreamError> {
        let job = self.export_repo.find_by_id(msg.job_id).await.map_err(job_err)?;

        if job.output_format != "geojson" {
            let err = StreamError::Processing(format!("unsupported export format '{}'", job.output_format));
            self.export_repo
                .mark_failed(msg.job_id, &err.to_string())
                .await
                .map_err(job_err)?;
            return Err(err);
        }

        let clip_bbox = job
            .clip_polygon_wkt
            .as_deref()
            .and_then(parse_wkt_polygon_bbox);

        let mut retrieved_paths = Vec::with_capacity(job.dataset_ids.len());
        for dataset_id in &job.dataset_ids {
            let dataset = match self.dataset_repo.find_by_id(*dataset_id).await {
                Ok(d) => d,
                Err(e) => {
                    self.export_repo
                        .mark_failed(msg.job_id, &e.to_string())
                        .await
                        .map_err(job_err)?;
                    return Err(catalog_err(e));
                }
            };
            let backend_choice = match dataset.storage_mode {
                Some(StorageMode::SpatialDb) | None => BackendChoice::SpatialDb,
                Some(StorageMode::Columnar) | Some(StorageMode::Hybrid) => BackendChoice::ObjectStore,
            };
            let path = self
                .storage
                .retrieve_dataset(dataset.id, clip_bbox, backend_choice)
                .await
                .map_err(storage_err)?;
            retrieved_paths.push(path);
        }

        let merged_path = std::env::temp_dir().join(format!("ingest-export-{}.geojson", msg.job_id));
        merge_geojson_files(&retrieved_paths, &merged_path).map_err(storage_err)?;
        for path in &retrieved_paths {
            let _ = tokio::fs::remove_file(path).await;
        }

        let bytes = match tokio::fs::read(&merged_path).await {
            Ok(b) => b,
            Err(e) => {
                self.export_repo
                    .mark_failed(msg.job_id, &e.to_string())
                    .await
                    .map_err(job_err)?;
                return Err(StreamError::Processing(e.to_string()));
            }
        };
        let _ = tokio::fs::remove_file(&merged_path).await;

        let output_key = format!("exports/{}.geojson", msg.job_id);
        if let Err(e) = self
            .object_store
            .put(&ObjectPath::from(output_key.as_str()), Bytes::from(bytes).into())
            .await
        {
            self.export_repo
                .mark_failed(msg.job_id, &e.to_string())
                .await
                .map_err(job_err)?;
            return Err(StreamError::Processing(e.to_string()));
        }

        self.export_repo
            .mark_completed(msg.job_id, &output_key)
            .await
            .map_err(job_err)?;

        info!(job_id = %msg.job_id, output_key, "export completed");
        Ok(())
    }
}

#[async_trait]
impl StreamProcessor<ExportJobMessage> for ExportProcessor {
    async fn process(&self, job: &ExportJobMessage) -> Result<(), StreamError> {
        self.run_export(job).await
    }

    fn name(&self) -> &'static str {
        "export-processor"
    }
}

/// Extracts the axis-aligned bbox of a `POLYGON((x y, x y, ...))` WKT
/// string. Arbitrary clip geometry isn't supported by the retrieval path
/// yet, so a clip request degrades to "clip to this polygon's envelope".
fn parse_wkt_polygon_bbox(wkt: &str) -> Option<StorageBoundingBox> {
    let start = wkt.find("((")? + 2;
    let end = wkt.rfind("))")?;
    if end <= start {
        return None;
    }
    let coords = &wkt[start..end];

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    let mut saw_point = false;
    for pair in coords.split(',') {
        let mut parts = pair.split_whitespace();
        let x: f64 = parts.next()?.parse().ok()?;
        let y: f64 = parts.next()?.parse().ok()?;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
        saw_point = true;
    }

    saw_point.then_some(StorageBoundingBox { min_x, min_y, max_x, max_y })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_key_covers_every_variant() {
        assert_eq!(provider_kind_key(&ProviderKind::ArcGis), "arcgis");
        assert_eq!(provider_kind_key(&ProviderKind::Wfs), "wfs");
        assert_eq!(provider_kind_key(&ProviderKind::Wcs), "wcs");
        assert_eq!(provider_kind_key(&ProviderKind::Ckan), "ckan");
        assert_eq!(provider_kind_key(&ProviderKind::OpenDataSoft), "opendatasoft");
        assert_eq!(provider_kind_key(&ProviderKind::S3Listing), "s3_listing");
        assert_eq!(provider_kind_key(&ProviderKind::Atom), "atom");
        assert_eq!(provider_kind_key(&ProviderKind::Direct), "direct");
        assert_eq!(provider_kind_key(&ProviderKind::Gee), "gee");
    }

    #[test]
    fn download_strategy_maps_paged_and_parallel() {
        assert_eq!(download_strategy_for(DownloadStrategyChoice::Paged), DownloadStrategy::Paged);
        assert_eq!(
            download_strategy_for(DownloadStrategyChoice::Parallel),
            DownloadStrategy::Chunked
        );
    }

    #[test]
    fn staging_paths_are_namespaced_by_id() {
        let job_id = Uuid::nil();
        let path = download_staging_path(job_id);
        assert!(path.to_string_lossy().contains(&job_id.to_string()));
        assert!(path.to_string_lossy().ends_with(".geojson"));

        let chunk_id = Uuid::nil();
        let chunk_path = chunk_staging_path(job_id, chunk_id);
        assert_ne!(path, chunk_path);
    }

    #[test]
    fn parse_wkt_polygon_bbox_extracts_envelope() {
        let wkt = "POLYGON((-122.5 37.6, -122.5 37.9, -122.3 37.9, -122.3 37.6, -122.5 37.6))";
        let bbox = parse_wkt_polygon_bbox(wkt).expect("valid polygon");
        assert_eq!(bbox.min_x, -122.5);
        assert_eq!(bbox.max_x, -122.3);
        assert_eq!(bbox.min_y, 37.6);
        assert_eq!(bbox.max_y, 37.9);
    }

    #[test]
    fn parse_wkt_polygon_bbox_rejects_malformed_input() {
        assert!(parse_wkt_polygon_bbox("POINT(1 2)").is_none());
        assert!(parse_wkt_polygon_bbox("POLYGON(())").is_none());
        assert!(parse_wkt_polygon_bbox("not wkt at all").is_none());
    }

    #[test]
    fn unsupported_provider_names_the_kind_in_the_message() {
        let err = unsupported_provider(&ProviderKind::Wfs);
        let StreamError::Processing(msg) = err else {
            panic!("expected a Processing variant");
        };
        assert!(msg.contains("Wfs"));
    }
}
