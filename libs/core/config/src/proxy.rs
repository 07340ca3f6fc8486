use crate::{env_or_default, ConfigError, FromEnv};

/// A single static proxy pool entry: URL plus an optional country code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticProxyEntry {
    pub url: String,
    pub country: Option<String>,
}

/// Proxy Manager configuration.
///
/// Populates the provider chain: per-server overrides (not configured here,
/// they live on the Server row), a free-pool fetcher, a paid rotating
/// provider, and a static pool, in priority order.
#[derive(Clone, Debug)]
pub struct ProxyManagerConfig {
    pub free_pool_enabled: bool,
    pub free_pool_ttl_secs: u64,
    pub paid_provider_api_key: Option<String>,
    pub paid_provider_endpoint: Option<String>,
    pub static_pool: Vec<StaticProxyEntry>,
}

impl FromEnv for ProxyManagerConfig {
    /// `STATIC_PROXY_LIST` is `url;country|url;country|...`; `country` may be
    /// omitted (`url;|...`) when a static proxy has no known locale.
    fn from_env() -> Result<Self, ConfigError> {
        let static_pool = std::env::var("STATIC_PROXY_LIST")
            .ok()
            .map(|raw| parse_static_pool(&raw))
            .unwrap_or_default();

        Ok(Self {
            free_pool_enabled: env_or_default("FREE_PROXY_POOL_ENABLED", "false")
                .parse()
                .unwrap_or(false),
            free_pool_ttl_secs: env_or_default("FREE_PROXY_POOL_TTL_SECS", "900")
                .parse()
                .unwrap_or(900),
            paid_provider_api_key: std::env::var("PAID_PROXY_API_KEY").ok(),
            paid_provider_endpoint: std::env::var("PAID_PROXY_ENDPOINT").ok(),
            static_pool,
        })
    }
}

fn parse_static_pool(raw: &str) -> Vec<StaticProxyEntry> {
    raw.split('|')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(2, ';');
            let url = parts.next().unwrap_or_default().to_string();
            let country = parts
                .next()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string());
            StaticProxyEntry { url, country }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_pool() {
        let parsed = parse_static_pool("http://a:1;US|http://b:2;|http://c:3;DE");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].country.as_deref(), Some("US"));
        assert_eq!(parsed[1].country, None);
        assert_eq!(parsed[2].url, "http://c:3");
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("STATIC_PROXY_LIST", None::<&str>),
                ("FREE_PROXY_POOL_ENABLED", None::<&str>),
            ],
            || {
                let config = ProxyManagerConfig::from_env().unwrap();
                assert!(!config.free_pool_enabled);
                assert_eq!(config.free_pool_ttl_secs, 900);
                assert!(config.static_pool.is_empty());
            },
        );
    }
}
