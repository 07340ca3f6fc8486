use bytes::Bytes;
use crate::error::{AdapterError, AdapterResult};
use flate2::read::GzDecoder;
use geo_proxy_manager::ProxyManager;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Some servers send gzip-compressed bodies without a `Content-Encoding`
/// header, which leaves reqwest's own transparent decompression unaware it
/// needs to run. Sniff the gzip magic bytes and decompress by hand when
/// present; anything else passes through untouched.
fn maybe_decompress_gzip(bytes: Bytes) -> Bytes {
    if bytes.len() < 2 || bytes[0..2] != GZIP_MAGIC {
        return bytes;
    }
    let mut decoder = GzDecoder::new(&bytes[..]);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Bytes::from(out),
        Err(_) => bytes,
    }
}

/// Thin HTTP layer over ArcGIS REST `query`/`layer metadata` endpoints.
/// Requests look like an ordinary browser tab rather than a bot, and retry
/// transient failures with capped exponential backoff.
#[derive(Clone)]
pub struct ArcGisClient {
    http: reqwest::Client,
    proxy_manager: Arc<ProxyManager>,
}

impl ArcGisClient {
    pub fn new(http: reqwest::Client, proxy_manager: Arc<ProxyManager>) -> Self {
        Self { http, proxy_manager }
    }

    async fn effective_client(&self) -> reqwest::Client {
        match self.proxy_manager.select_proxy(None, None).await {
            Some(proxy_url) => match reqwest::Proxy::all(&proxy_url) {
                Ok(proxy) => reqwest::Client::builder()
                    .proxy(proxy)
                    .build()
                    .unwrap_or_else(|_| self.http.clone()),
                Err(_) => self.http.clone(),
            },
            None => self.http.clone(),
        }
    }

    /// GETs `url` with `params`, retrying transient failures up to
    /// [`MAX_ATTEMPTS`] times with exponential backoff between `BACKOFF_BASE`
    /// and `BACKOFF_CAP`. A non-2xx status or malformed body is permanent.
    pub async fn get_json(&self, url: &str, params: &[(&str, String)]) -> AdapterResult<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let client = self.effective_client().await;
            let result = client
                .get(url)
                .query(params)
                .header("User-Agent", USER_AGENT)
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Accept-Encoding", "gzip, deflate")
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let bytes = response.bytes().await.map_err(AdapterError::from)?;
                    let bytes = maybe_decompress_gzip(bytes);
                    return serde_json::from_slice::<Value>(&bytes)
                        .map_err(|_| AdapterError::decode_failure(url, &bytes));
                }
                Ok(response)
                    if (response.status().is_server_error()
                        || response.status().as_u16() == 429)
                        && attempt < MAX_ATTEMPTS =>
                {
                    warn!(status = %response.status(), url, attempt, "transient arcgis error, retrying");
                }
                Ok(response) => {
                    return Err(AdapterError::PermanentUpstream(format!(
                        "{url} returned {}",
                        response.status()
                    )));
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    debug!(error = %e, url, attempt, "transient transport error, retrying");
                }
                Err(e) => return Err(AdapterError::from(e)),
            }

            let backoff = (BACKOFF_BASE * 2u32.pow(attempt - 1)).min(BACKOFF_CAP);
            tokio::time::sleep(backoff).await;
        }
    }

    pub async fn query_page(&self, access_url: &str, offset: u32, page_size: u32) -> AdapterResult<Value> {
        let url = format!("{access_url}/query");
        self.get_json(
            &url,
            &[
                ("f", "json".to_string()),
                ("where", "1=1".to_string()),
                ("outFields", "*".to_string()),
                ("returnGeometry", "true".to_string()),
                ("resultOffset", offset.to_string()),
                ("resultRecordCount", page_size.to_string()),
            ],
        )
        .await
    }

    pub async fn feature_count(&self, access_url: &str) -> AdapterResult<i64> {
        let url = format!("{access_url}/query");
        let body = self
            .get_json(
                &url,
                &[
                    ("f", "json".to_string()),
                    ("where", "1=1".to_string()),
                    ("returnCountOnly", "true".to_string()),
                ],
            )
            .await?;

        body.get("count")
            .and_then(Value::as_i64)
            .ok_or_else(|| AdapterError::decode_failure(&url, body.to_string().as_bytes()))
    }

    pub async fn layer_metadata(&self, access_url: &str) -> AdapterResult<Value> {
        self.get_json(access_url, &[("f", "json".to_string())]).await
    }

    pub async fn oid_range(&self, access_url: &str, oid_field: &str) -> AdapterResult<(i64, i64)> {
        let url = format!("{access_url}/query");
        let body = self
            .get_json(
                &url,
                &[
                    ("f", "json".to_string()),
                    ("where", "1=1".to_string()),
                    ("outStatistics", format!(
                        "[{{\"statisticType\":\"min\",\"onStatisticField\":\"{oid_field}\",\"outStatisticFieldName\":\"min_oid\"}},\
                          {{\"statisticType\":\"max\",\"onStatisticField\":\"{oid_field}\",\"outStatisticFieldName\":\"max_oid\"}}]"
                    )),
                ],
            )
            .await?;

        let attrs = body
            .get("features")
            .and_then(Value::as_array)
            .and_then(|f| f.first())
            .and_then(|f| f.get("attributes"))
            .ok_or_else(|| AdapterError::decode_failure(&url, body.to_string().as_bytes()))?;

        let min_oid = attrs.get("min_oid").and_then(Value::as_i64);
        let max_oid = attrs.get("max_oid").and_then(Value::as_i64);
        match (min_oid, max_oid) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(AdapterError::decode_failure(&url, body.to_string().as_bytes())),
        }
    }

    pub async fn query_oid_range(
        &self,
        access_url: &str,
        oid_field: &str,
        min_oid: i64,
        max_oid: i64,
    ) -> AdapterResult<Value> {
        let url = format!("{access_url}/query");
        self.get_json(
            &url,
            &[
                ("f", "json".to_string()),
                ("where", format!("{oid_field} >= {min_oid} AND {oid_field} <= {max_oid}")),
                ("outFields", "*".to_string()),
                ("returnGeometry", "true".to_string()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decompresses_gzip_body_missing_content_encoding_header() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(br#"{"ok":true}"#).unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        let decompressed = maybe_decompress_gzip(compressed);
        assert_eq!(&decompressed[..], br#"{"ok":true}"#);
    }

    #[test]
    fn passes_through_plain_bodies_unchanged() {
        let plain = Bytes::from_static(br#"{"ok":true}"#);
        assert_eq!(maybe_decompress_gzip(plain.clone()), plain);
    }
}
