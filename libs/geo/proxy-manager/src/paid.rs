use crate::{split_country_hint, ProxyProvider};
use async_trait::async_trait;

/// A paid rotating-proxy provider. Credentials are built by appending the
/// requested country code to the API key, matching the upstream vendor's
/// "username-country" session-credential convention.
pub struct PaidProvider {
    api_key: String,
    endpoint: String,
}

impl PaidProvider {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self { api_key, endpoint }
    }

    fn build_url(&self, country: Option<&str>) -> String {
        let credentials = match country {
            Some(c) => format!("{}-{}", self.api_key, c),
            None => self.api_key.clone(),
        };
        format!("http://{}@{}", credentials, self.endpoint)
    }
}

#[async_trait]
impl ProxyProvider for PaidProvider {
    fn name(&self) -> &'static str {
        "paid_rotating"
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn get_proxy(&self, country_hint: Option<&str>) -> Option<String> {
        let country = country_hint.and_then(|hint| split_country_hint(hint).into_iter().next());
        Some(self.build_url(country))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_first_country_code() {
        let provider = PaidProvider::new("key123".into(), "proxy.example.com:8000".into());
        let url = provider.get_proxy(Some("US,DE")).await.unwrap();
        assert_eq!(url, "http://key123-US@proxy.example.com:8000");
    }

    #[tokio::test]
    async fn no_hint_uses_bare_key() {
        let provider = PaidProvider::new("key123".into(), "proxy.example.com:8000".into());
        let url = provider.get_proxy(None).await.unwrap();
        assert_eq!(url, "http://key123@proxy.example.com:8000");
    }
}
