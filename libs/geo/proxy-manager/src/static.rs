use crate::{split_country_hint, ProxyProvider};
use async_trait::async_trait;
use core_config::proxy::StaticProxyEntry;

/// A fixed pool of proxies parsed from configuration. Tries to match the
/// country hint against each entry's recorded country; falls back to any
/// available proxy if nothing matches.
pub struct StaticPoolProvider {
    entries: Vec<StaticProxyEntry>,
}

impl StaticPoolProvider {
    pub fn new(entries: Vec<StaticProxyEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ProxyProvider for StaticPoolProvider {
    fn name(&self) -> &'static str {
        "static_pool"
    }

    fn priority(&self) -> i32 {
        1
    }

    async fn get_proxy(&self, country_hint: Option<&str>) -> Option<String> {
        if let Some(hint) = country_hint {
            for code in split_country_hint(hint) {
                if let Some(entry) = self
                    .entries
                    .iter()
                    .find(|e| e.country.as_deref() == Some(code))
                {
                    return Some(entry.url.clone());
                }
            }
        }
        self.entries.first().map(|e| e.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, country: Option<&str>) -> StaticProxyEntry {
        StaticProxyEntry {
            url: url.to_string(),
            country: country.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn matches_country_hint() {
        let provider = StaticPoolProvider::new(vec![
            entry("http://a:1", Some("US")),
            entry("http://b:2", Some("DE")),
        ]);
        let selected = provider.get_proxy(Some("FR,DE")).await;
        assert_eq!(selected.as_deref(), Some("http://b:2"));
    }

    #[tokio::test]
    async fn falls_back_to_first_entry() {
        let provider = StaticPoolProvider::new(vec![entry("http://a:1", Some("US"))]);
        let selected = provider.get_proxy(Some("FR")).await;
        assert_eq!(selected.as_deref(), Some("http://a:1"));
    }
}
