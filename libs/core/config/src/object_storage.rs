use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// S3-compatible object storage configuration.
///
/// Tested against S3, MinIO, R2, and GCS; `endpoint` and `force_path_style`
/// exist to support non-AWS providers.
#[derive(Clone, Debug)]
pub struct ObjectStorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub public_endpoint: Option<String>,
    pub force_path_style: bool,
}

impl FromEnv for ObjectStorageConfig {
    /// Requires `OBJECT_STORAGE_BUCKET`, `OBJECT_STORAGE_ACCESS_KEY`, and
    /// `OBJECT_STORAGE_SECRET_KEY`. `OBJECT_STORAGE_ENDPOINT` is optional
    /// (unset selects AWS S3's default endpoint resolution).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: std::env::var("OBJECT_STORAGE_ENDPOINT").ok(),
            region: env_or_default("OBJECT_STORAGE_REGION", "us-east-1"),
            bucket: env_required("OBJECT_STORAGE_BUCKET")?,
            access_key: env_required("OBJECT_STORAGE_ACCESS_KEY")?,
            secret_key: env_required("OBJECT_STORAGE_SECRET_KEY")?,
            public_endpoint: std::env::var("OBJECT_STORAGE_PUBLIC_ENDPOINT").ok(),
            force_path_style: env_or_default("OBJECT_STORAGE_FORCE_PATH_STYLE", "false")
                .parse()
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_missing_bucket() {
        temp_env::with_vars(
            [
                ("OBJECT_STORAGE_BUCKET", None::<&str>),
                ("OBJECT_STORAGE_ACCESS_KEY", Some("ak")),
                ("OBJECT_STORAGE_SECRET_KEY", Some("sk")),
            ],
            || {
                let result = ObjectStorageConfig::from_env();
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_from_env_success() {
        temp_env::with_vars(
            [
                ("OBJECT_STORAGE_BUCKET", Some("catalog-cache")),
                ("OBJECT_STORAGE_ACCESS_KEY", Some("ak")),
                ("OBJECT_STORAGE_SECRET_KEY", Some("sk")),
                ("OBJECT_STORAGE_ENDPOINT", Some("http://localhost:9000")),
            ],
            || {
                let config = ObjectStorageConfig::from_env().unwrap();
                assert_eq!(config.bucket, "catalog-cache");
                assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
                assert_eq!(config.region, "us-east-1");
            },
        );
    }
}
