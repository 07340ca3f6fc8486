use crate::ProxyProvider;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// ProxyScrape's public free-proxy list endpoint: a plaintext response, one
/// `ip:port` per line. No API key, no auth — matches the "free pool" tier's
/// contract (best-effort, no SLA).
const DEFAULT_FREE_PROXY_LIST_URL: &str =
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all";

struct Cache {
    proxies: Vec<String>,
    fetched_at: Instant,
}

/// Fetches a list of free proxies and caches it for a TTL, refreshing on
/// demand once expired. Country filtering is not meaningful for the free
/// pool (upstream lists rarely carry reliable locale data), so the hint is
/// accepted but ignored.
pub struct FreePoolProvider {
    ttl: Duration,
    list_url: String,
    http: reqwest::Client,
    cache: Mutex<Option<Cache>>,
}

impl FreePoolProvider {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_list_url(ttl_secs, DEFAULT_FREE_PROXY_LIST_URL.to_string())
    }

    pub fn with_list_url(ttl_secs: u64, list_url: String) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            list_url,
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Vec<String> {
        // Upstream free-proxy list fetch is a best-effort network call;
        // failures here are swallowed by the caller per the chain contract.
        match fetch_free_proxy_list(&self.http, &self.list_url).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "failed to refresh free proxy pool");
                Vec::new()
            }
        }
    }

    fn cached(&self) -> Option<Vec<String>> {
        let guard = self.cache.lock().expect("free pool cache poisoned");
        guard.as_ref().and_then(|c| {
            if c.fetched_at.elapsed() < self.ttl {
                Some(c.proxies.clone())
            } else {
                None
            }
        })
    }

    fn store(&self, proxies: Vec<String>) {
        let mut guard = self.cache.lock().expect("free pool cache poisoned");
        *guard = Some(Cache {
            proxies,
            fetched_at: Instant::now(),
        });
    }
}

/// Fetches and parses a plaintext `ip:port`-per-line free-proxy list.
async fn fetch_free_proxy_list(
    http: &reqwest::Client,
    list_url: &str,
) -> Result<Vec<String>, reqwest::Error> {
    let body = http.get(list_url).send().await?.error_for_status()?.text().await?;
    Ok(parse_proxy_list(&body))
}

fn parse_proxy_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains(':'))
        .map(|line| format!("http://{line}"))
        .collect()
}

#[async_trait]
impl ProxyProvider for FreePoolProvider {
    fn name(&self) -> &'static str {
        "free_pool"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn get_proxy(&self, _country_hint: Option<&str>) -> Option<String> {
        let proxies = match self.cached() {
            Some(p) => p,
            None => {
                let fresh = self.refresh().await;
                self.store(fresh.clone());
                fresh
            }
        };
        proxies.first().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_list_url_yields_none_instead_of_erroring() {
        // Port 0 is never listening; the fetch fails and is swallowed,
        // matching the "a failing provider simply yields None" contract.
        let provider = FreePoolProvider::with_list_url(900, "http://127.0.0.1:0/".to_string());
        assert_eq!(provider.get_proxy(None).await, None);
    }

    #[test]
    fn cache_respects_ttl() {
        let provider = FreePoolProvider::new(900);
        provider.store(vec!["http://a:1".into()]);
        assert_eq!(provider.cached(), Some(vec!["http://a:1".into()]));
    }

    #[test]
    fn parses_ip_port_lines_into_proxy_urls() {
        let body = "1.2.3.4:8080\r\n5.6.7.8:3128\n\n";
        assert_eq!(
            parse_proxy_list(body),
            vec!["http://1.2.3.4:8080", "http://5.6.7.8:3128"]
        );
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let body = "not-a-proxy\n\n1.2.3.4:8080\n";
        assert_eq!(parse_proxy_list(body), vec!["http://1.2.3.4:8080"]);
    }
}
