use crate::{env_or_default, ConfigError, FromEnv};

/// Ingestion-engine-wide tuning knobs: crawl cadence defaults, download
/// timeouts, concurrency caps, and the storage-mode selection policy.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub default_probe_frequency_hours: u32,
    pub default_download_timeout_secs: u64,
    pub max_concurrent_downloads_per_server: u32,
    pub max_chunk_parallel: u32,
    pub storage_backend: StorageBackendSelector,
    pub use_object_storage_for_large_datasets: bool,
    pub min_features_for_object_storage: u64,
}

/// Mirrors the `STORAGE_BACKEND` environment selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackendSelector {
    Postgis,
    ObjectStorage,
    Hybrid,
}

impl FromEnv for IngestConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = match env_or_default("STORAGE_BACKEND", "hybrid").as_str() {
            "postgis" => StorageBackendSelector::Postgis,
            "object_storage" => StorageBackendSelector::ObjectStorage,
            "hybrid" => StorageBackendSelector::Hybrid,
            other => {
                return Err(ConfigError::ParseError {
                    key: "STORAGE_BACKEND".to_string(),
                    details: format!("unknown storage backend '{other}'"),
                })
            }
        };

        Ok(Self {
            default_probe_frequency_hours: env_or_default("DEFAULT_PROBE_FREQUENCY_HOURS", "24")
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: "DEFAULT_PROBE_FREQUENCY_HOURS".to_string(),
                    details: format!("{e}"),
                })?,
            default_download_timeout_secs: env_or_default("DEFAULT_DOWNLOAD_TIMEOUT_SECS", "3600")
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: "DEFAULT_DOWNLOAD_TIMEOUT_SECS".to_string(),
                    details: format!("{e}"),
                })?,
            max_concurrent_downloads_per_server: env_or_default(
                "MAX_CONCURRENT_DOWNLOADS_PER_SERVER",
                "4",
            )
            .parse()
            .map_err(|e| ConfigError::ParseError {
                key: "MAX_CONCURRENT_DOWNLOADS_PER_SERVER".to_string(),
                details: format!("{e}"),
            })?,
            max_chunk_parallel: env_or_default("MAX_CHUNK_PARALLEL", "10")
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: "MAX_CHUNK_PARALLEL".to_string(),
                    details: format!("{e}"),
                })?,
            storage_backend,
            use_object_storage_for_large_datasets: env_or_default(
                "USE_OBJECT_STORAGE_FOR_LARGE_DATASETS",
                "true",
            )
            .parse()
            .unwrap_or(true),
            min_features_for_object_storage: env_or_default(
                "MIN_FEATURES_FOR_OBJECT_STORAGE",
                "10000",
            )
            .parse()
            .unwrap_or(10_000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("STORAGE_BACKEND", None::<&str>),
                ("MIN_FEATURES_FOR_OBJECT_STORAGE", None::<&str>),
            ],
            || {
                let config = IngestConfig::from_env().unwrap();
                assert_eq!(config.storage_backend, StorageBackendSelector::Hybrid);
                assert_eq!(config.min_features_for_object_storage, 10_000);
                assert_eq!(config.max_chunk_parallel, 10);
            },
        );
    }

    #[test]
    fn test_rejects_unknown_backend() {
        temp_env::with_var("STORAGE_BACKEND", Some("bogus"), || {
            assert!(IngestConfig::from_env().is_err());
        });
    }
}
