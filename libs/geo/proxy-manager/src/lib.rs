//! Outbound HTTP proxy selection for provider adapters.
//!
//! A priority-ordered chain of providers, merged with a transient
//! per-server override at the highest priority. Modeled on the chain-of-
//! responsibility shape of the original `proxy.py` provider list, kept
//! generic so new provider kinds can be registered without touching the
//! manager itself.

mod free_pool;
mod paid;
mod r#static;

pub use free_pool::FreePoolProvider;
pub use paid::PaidProvider;
pub use r#static::StaticPoolProvider;

use async_trait::async_trait;
use core_config::proxy::ProxyManagerConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// A single outbound proxy provider in the priority chain.
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher priority providers are tried first. The per-server override
    /// provider is synthesized at priority 1000, above any registered
    /// provider.
    fn priority(&self) -> i32;

    fn enabled(&self) -> bool {
        true
    }

    /// Returns a proxy URL for the given comma-separated country hint, if
    /// this provider has one available. Errors are swallowed by the
    /// manager; a failing provider simply yields `None`.
    async fn get_proxy(&self, country_hint: Option<&str>) -> Option<String>;
}

/// A server's own connection blob, promoted to a transient provider with
/// priority 1000 so per-server overrides always win.
pub struct ServerOverrideProvider {
    proxy_url: Option<String>,
}

impl ServerOverrideProvider {
    pub fn new(proxy_url: Option<String>) -> Self {
        Self { proxy_url }
    }
}

#[async_trait]
impl ProxyProvider for ServerOverrideProvider {
    fn name(&self) -> &'static str {
        "server_override"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn enabled(&self) -> bool {
        self.proxy_url.is_some()
    }

    async fn get_proxy(&self, _country_hint: Option<&str>) -> Option<String> {
        self.proxy_url.clone()
    }
}

/// Selects an outbound proxy for a request by walking the provider chain in
/// priority order and returning the first non-empty URL.
pub struct ProxyManager {
    providers: Vec<Arc<dyn ProxyProvider>>,
}

impl ProxyManager {
    /// Builds the manager's standing provider chain from configuration.
    /// This is a process-wide singleton configured once at startup; it does
    /// not support hot reconfiguration.
    pub fn from_config(config: &ProxyManagerConfig) -> Self {
        let mut providers: Vec<Arc<dyn ProxyProvider>> = Vec::new();

        if config.free_pool_enabled {
            providers.push(Arc::new(FreePoolProvider::new(config.free_pool_ttl_secs)));
        }

        if let (Some(key), Some(endpoint)) = (
            config.paid_provider_api_key.clone(),
            config.paid_provider_endpoint.clone(),
        ) {
            providers.push(Arc::new(PaidProvider::new(key, endpoint)));
        }

        if !config.static_pool.is_empty() {
            providers.push(Arc::new(StaticPoolProvider::new(
                config.static_pool.clone(),
            )));
        }

        Self { providers }
    }

    pub fn new(providers: Vec<Arc<dyn ProxyProvider>>) -> Self {
        Self { providers }
    }

    /// Returns the first available proxy URL, merging a transient
    /// per-server override (priority 1000) with the registered chain.
    ///
    /// `country_hint` may be a comma-separated list; each provider iterates
    /// the codes in order and falls back to any available proxy if none
    /// match. A provider that errors or returns nothing is skipped; the
    /// chain continues to the next provider.
    pub async fn select_proxy(
        &self,
        server_override: Option<&str>,
        country_hint: Option<&str>,
    ) -> Option<String> {
        let override_provider = ServerOverrideProvider::new(server_override.map(str::to_string));

        let mut chain: Vec<&dyn ProxyProvider> = Vec::with_capacity(self.providers.len() + 1);
        if override_provider.enabled() {
            chain.push(&override_provider);
        }
        for provider in &self.providers {
            if provider.enabled() {
                chain.push(provider.as_ref());
            }
        }
        chain.sort_by_key(|p| std::cmp::Reverse(p.priority()));

        for provider in chain {
            match provider.get_proxy(country_hint).await {
                Some(url) => {
                    debug!(provider = provider.name(), "selected proxy");
                    return Some(url);
                }
                None => {
                    warn!(provider = provider.name(), "proxy provider yielded none, continuing chain");
                }
            }
        }

        None
    }
}

/// Splits a comma-separated country hint into individual codes, trimmed and
/// with empties dropped.
pub fn split_country_hint(hint: &str) -> Vec<&str> {
    hint.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysNone;

    #[async_trait]
    impl ProxyProvider for AlwaysNone {
        fn name(&self) -> &'static str {
            "always_none"
        }
        fn priority(&self) -> i32 {
            10
        }
        async fn get_proxy(&self, _country_hint: Option<&str>) -> Option<String> {
            None
        }
    }

    struct AlwaysSome(&'static str);

    #[async_trait]
    impl ProxyProvider for AlwaysSome {
        fn name(&self) -> &'static str {
            "always_some"
        }
        fn priority(&self) -> i32 {
            5
        }
        async fn get_proxy(&self, _country_hint: Option<&str>) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn server_override_wins_over_registered_providers() {
        let manager = ProxyManager::new(vec![Arc::new(AlwaysSome("http://pool:8080"))]);
        let selected = manager
            .select_proxy(Some("http://override:9090"), None)
            .await;
        assert_eq!(selected.as_deref(), Some("http://override:9090"));
    }

    #[tokio::test]
    async fn falls_through_failing_providers() {
        let manager = ProxyManager::new(vec![
            Arc::new(AlwaysNone),
            Arc::new(AlwaysSome("http://pool:8080")),
        ]);
        let selected = manager.select_proxy(None, None).await;
        assert_eq!(selected.as_deref(), Some("http://pool:8080"));
    }

    #[tokio::test]
    async fn no_providers_yields_none() {
        let manager = ProxyManager::new(vec![]);
        assert_eq!(manager.select_proxy(None, None).await, None);
    }

    #[test]
    fn splits_and_trims_country_hint() {
        assert_eq!(split_country_hint("US, DE ,, FR"), vec!["US", "DE", "FR"]);
    }
}
