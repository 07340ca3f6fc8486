//! Ingest Worker Service
//!
//! A background worker that crawls geospatial catalog servers, downloads
//! their datasets, and caches the results so the Catalog Store can serve
//! them without round-tripping upstream on every request.
//!
//! ## Architecture
//!
//! ```text
//! Redis Streams (ingest:crawl, ingest:download, ingest:download_chunk, ingest:export)
//!   ↓ (one consumer group per stream)
//! StreamWorker<J, P> x4
//!   ↓
//! CrawlProcessor / DownloadProcessor / ChunkProcessor / ExportProcessor
//!   ↓
//! ProviderAdapter (ArcGIS, ...) + HybridStorageRouter (Postgis / ObjectStore)
//!   ↓
//! PostgreSQL (catalog + job state) / S3-compatible object storage
//! ```
//!
//! All four workers share one PostgreSQL pool, one Redis connection, and one
//! health/admin HTTP server (bound to the crawl stream, since it's the
//! entrypoint of the pipeline).

mod error;
mod janitor;
mod processors;

use core_config::ingest::IngestConfig;
use core_config::object_storage::ObjectStorageConfig;
use core_config::proxy::ProxyManagerConfig;
use core_config::tiling::TilingConfig;
use core_config::{Environment, FromEnv};
use database::postgres::{connect_from_config_with_retry, run_migrations, PostgresConfig};
use database::redis::RedisConfig;
use eyre::{Result, WrapErr};
use geo_adapters::arcgis::ArcGisAdapter;
use geo_adapters::AdapterRegistry;
use geo_catalog::{DatasetRepository, ServerRepository};
use geo_jobs::{
    CrawlJobRepository, CrawlStream, DownloadChunkRepository, DownloadChunkStream,
    DownloadJobRepository, DownloadStream, ExportJobRepository, ExportStream,
};
use geo_proxy_manager::ProxyManager;
use geo_storage::object_store_backend::build_object_store;
use geo_storage::{HybridStorageRouter, ObjectStoreBackend, SpatialDbBackend, TileBuildConfig};
use processors::{ChunkProcessor, CrawlProcessor, DownloadProcessor, ExportProcessor};
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{full_admin_router, metrics, HealthState, StreamWorker, WorkerConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Start the health and admin HTTP server, bound to the crawl stream.
///
/// The download/chunk/export streams don't get their own health endpoint;
/// they're monitored through `/admin/dlq/*` and Prometheus metrics instead,
/// same as the crawl stream.
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app = full_admin_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health and admin server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the ingest worker.
///
/// This is the main entry point. It:
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Connects to PostgreSQL and runs catalog/job migrations
/// 3. Connects to Redis for stream processing
/// 4. Wires the provider adapter registry and the hybrid storage router
/// 5. Starts all four stream workers with graceful shutdown handling
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    metrics::init_metrics();

    info!(name = APP_NAME, version = APP_VERSION, "Starting ingest worker service");
    info!("Environment: {:?}", environment);

    let health_port: u16 = std::env::var("INGEST_WORKER_HEALTH_PORT")
        .or_else(|_| std::env::var("HEALTH_PORT"))
        .unwrap_or_else(|_| "8083".to_string())
        .parse()
        .unwrap_or(8083);

    let pg_config =
        PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;

    info!("Connecting to PostgreSQL...");
    let db = connect_from_config_with_retry(pg_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    info!("Connected to PostgreSQL successfully");

    run_migrations::<migration::Migrator>(&db, "ingest-worker")
        .await
        .wrap_err("Failed to run database migrations")?;

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;

    info!("Connecting to Redis...");
    let redis = database::redis::connect_from_config_with_retry(redis_config, None)
        .await
        .wrap_err("Failed to connect to Redis")?;
    info!("Connected to Redis successfully");

    // Repositories, one per entity, all sharing the same pool.
    let server_repo = ServerRepository::new(db.clone());
    let dataset_repo = DatasetRepository::new(db.clone());
    let crawl_repo = CrawlJobRepository::new(db.clone());
    let download_repo = DownloadJobRepository::new(db.clone());
    let chunk_repo = DownloadChunkRepository::new(db.clone());
    let export_repo = ExportJobRepository::new(db.clone());

    // Provider adapters. Only ArcGIS is concretely wired; new provider kinds
    // register here as they gain an implementation.
    let proxy_config =
        ProxyManagerConfig::from_env().wrap_err("Failed to load proxy manager configuration")?;
    let proxy_manager = Arc::new(ProxyManager::from_config(&proxy_config));
    let http = reqwest::Client::new();

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ArcGisAdapter::new(proxy_manager.clone(), http.clone())));
    let registry = Arc::new(registry);

    // Storage: Postgis for small/medium datasets, object storage (+ PMTiles)
    // for large ones, chosen per-dataset by the hybrid router.
    let object_storage_config =
        ObjectStorageConfig::from_env().wrap_err("Failed to load object storage configuration")?;
    let object_store = build_object_store(&object_storage_config)
        .wrap_err("Failed to build object storage client")?;
    let tiling_config = TilingConfig::from_env().wrap_err("Failed to load tiling configuration")?;
    let ingest_config = IngestConfig::from_env().wrap_err("Failed to load ingest configuration")?;

    let spatial_db = SpatialDbBackend::new(db.clone());
    let object_store_backend =
        ObjectStoreBackend::new(object_store.clone(), Some(TileBuildConfig::from(&tiling_config)));
    let storage = Arc::new(HybridStorageRouter::new(
        spatial_db,
        object_store_backend,
        ingest_config,
    ));

    let crawl_processor =
        CrawlProcessor::new(server_repo.clone(), dataset_repo.clone(), crawl_repo, registry.clone());
    let download_processor = DownloadProcessor::new(
        dataset_repo.clone(),
        server_repo.clone(),
        download_repo.clone(),
        registry.clone(),
        storage.clone(),
    );
    let chunk_processor = ChunkProcessor::new(
        dataset_repo.clone(),
        server_repo,
        download_repo,
        chunk_repo,
        registry,
        storage.clone(),
    );
    let janitor_export_repo = export_repo.clone();
    let janitor_object_store = object_store.clone();
    let export_processor =
        ExportProcessor::new(dataset_repo, export_repo, storage, object_store);

    let crawl_config = WorkerConfig::from_stream_def::<CrawlStream>()
        .with_blocking(Some(1000))
        .with_batch_size(10)
        .with_max_concurrent_jobs(4);
    let download_config = WorkerConfig::from_stream_def::<DownloadStream>()
        .with_blocking(Some(1000))
        .with_batch_size(10)
        .with_max_concurrent_jobs(8);
    let chunk_config = WorkerConfig::from_stream_def::<DownloadChunkStream>()
        .with_blocking(Some(1000))
        .with_batch_size(20)
        .with_max_concurrent_jobs(16);
    let export_config = WorkerConfig::from_stream_def::<ExportStream>()
        .with_blocking(Some(1000))
        .with_batch_size(5)
        .with_max_concurrent_jobs(2);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(
        Arc::new(redis.clone()),
        APP_NAME,
        APP_VERSION,
        crawl_config.stream_name.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    info!("Starting stream workers...");
    let crawl_worker = StreamWorker::new(redis.clone(), crawl_processor, crawl_config);
    let download_worker = StreamWorker::new(redis.clone(), download_processor, download_config);
    let chunk_worker = StreamWorker::new(redis.clone(), chunk_processor, chunk_config);
    let export_worker = StreamWorker::new(redis, export_processor, export_config);

    let crawl_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { crawl_worker.run(rx).await }
    });
    let download_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { download_worker.run(rx).await }
    });
    let chunk_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { chunk_worker.run(rx).await }
    });
    let export_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { export_worker.run(rx).await }
    });
    let janitor_handle = tokio::spawn(janitor::run(
        janitor_export_repo,
        janitor_object_store,
        Duration::from_secs(300),
        shutdown_rx,
    ));

    let (crawl_res, download_res, chunk_res, export_res, _) = tokio::join!(
        crawl_handle,
        download_handle,
        chunk_handle,
        export_handle,
        janitor_handle
    );

    for (name, res) in [
        ("crawl", crawl_res),
        ("download", download_res),
        ("chunk", chunk_res),
        ("export", export_res),
    ] {
        match res {
            Ok(Ok(())) => info!(worker = name, "worker stopped cleanly"),
            Ok(Err(e)) => error!(worker = name, error = %e, "worker exited with error"),
            Err(e) => error!(worker = name, error = %e, "worker task panicked"),
        }
    }

    info!("Ingest worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
