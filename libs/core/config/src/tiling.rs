use crate::{env_or_default, ConfigError, FromEnv};

/// Paths to the external CLI tools the Tile Generator shells out to.
#[derive(Clone, Debug)]
pub struct TilingConfig {
    pub tippecanoe_path: String,
    pub simplification: f64,
    pub buffer: u32,
}

impl FromEnv for TilingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tippecanoe_path: env_or_default("TIPPECANOE_PATH", "tippecanoe"),
            simplification: env_or_default("TILE_SIMPLIFICATION", "10")
                .parse()
                .unwrap_or(10.0),
            buffer: env_or_default("TILE_BUFFER", "64").parse().unwrap_or(64),
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
                ("TIPPECANOE_PATH", None::<&str>),
                ("TILE_SIMPLIFICATION", None::<&str>),
            ],
            || {
                let config = TilingConfig::from_env().unwrap();
                assert_eq!(config.tippecanoe_path, "tippecanoe");
                assert_eq!(config.simplification, 10.0);
                assert_eq!(config.buffer, 64);
            },
        );
    }
}
