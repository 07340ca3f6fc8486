use crate::error::{StorageError, StorageResult};
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

/// Picks a conservative max zoom from the feature count so that very large
/// datasets don't produce an unbounded number of tiles.
pub fn adaptive_max_zoom(feature_count: i64) -> u8 {
    match feature_count {
        n if n < 1_000 => 16,
        n if n < 10_000 => 15,
        n if n < 100_000 => 14,
        _ => 12,
    }
}

#[derive(Clone, Debug)]
pub struct TileBuildConfig {
    pub tippecanoe_path: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub simplification: f64,
    pub buffer: u32,
}

impl From<&core_config::tiling::TilingConfig> for TileBuildConfig {
    fn from(cfg: &core_config::tiling::TilingConfig) -> Self {
        Self {
            tippecanoe_path: cfg.tippecanoe_path.clone(),
            min_zoom: 0,
            max_zoom: 14,
            simplification: cfg.simplification,
            buffer: cfg.buffer,
        }
    }
}

/// Shells out to `tippecanoe` to build a PMTiles archive for a dataset.
/// The caller is responsible for deleting `geojson_path` and `output_path`
/// as appropriate; this function only invokes the external tool.
pub async fn build_tiles(
    config: &TileBuildConfig,
    dataset_id: uuid::Uuid,
    geojson_path: &Path,
    output_path: &Path,
) -> StorageResult<()> {
    let layer_name = dataset_id.to_string();

    let output = Command::new(&config.tippecanoe_path)
        .arg("--projection=EPSG:4326")
        .arg("--no-feature-limit")
        .arg("--drop-densest-as-needed")
        .arg("--extend-zooms-if-still-dropping")
        .arg(format!("--minimum-zoom={}", config.min_zoom))
        .arg(format!("--maximum-zoom={}", config.max_zoom))
        .arg(format!("--simplification={}", config.simplification))
        .arg(format!("--buffer={}", config.buffer))
        .arg("--layer")
        .arg(&layer_name)
        .arg("--force")
        .arg("-o")
        .arg(output_path)
        .arg(geojson_path)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(%dataset_id, stderr = %stderr, "tippecanoe failed");
        return Err(StorageError::TileGeneration(stderr.into_owned()));
    }

    info!(%dataset_id, path = %output_path.display(), "built tile archive");
    Ok(())
}
