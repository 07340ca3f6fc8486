use crate::ProviderAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one adapter instance per provider kind, keyed by the same string
/// `ProviderAdapter::provider_kind` returns. Construction wires concrete
/// adapters up front; lookup is a plain map hit, never async.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider_kind(), adapter);
    }

    pub fn get(&self, provider_kind: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(provider_kind).cloned()
    }

    pub fn provider_kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcgis::ArcGisAdapter;
    use geo_proxy_manager::ProxyManager;
    use std::sync::Arc;

    #[test]
    fn register_and_look_up_by_provider_kind() {
        let mut registry = AdapterRegistry::new();
        let adapter = ArcGisAdapter::new(Arc::new(ProxyManager::new(vec![])), reqwest::Client::new());
        registry.register(Arc::new(adapter));

        assert!(registry.get("arcgis").is_some());
        assert!(registry.get("wfs").is_none());
    }
}
