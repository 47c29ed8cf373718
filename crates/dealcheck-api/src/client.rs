use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use dealcheck_core::{AnalyzeBackend, AnalyzeResult, ApiError, HealthStatus, MetaHit};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Talks to a running analysis server over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        build_url(&self.base_url, path)
    }
}

#[async_trait]
impl AnalyzeBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let body = read_body(resp).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    #[instrument(skip(self, image), fields(file = %file_name, bytes = image.len()))]
    async fn analyze_receipt(
        &self,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<AnalyzeResult, ApiError> {
        let part = Part::bytes(image).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url("/analyzeReceipt"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let body = read_body(resp).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn meta_search(&self, keyword: &str) -> Result<Vec<MetaHit>, ApiError> {
        let resp = self
            .client
            .get(self.url("/metaSearch"))
            .query(&[("q", keyword)])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let body = read_body(resp).await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(hits_from_value(value))
    }
}

/// Drains the response body, turning any non-2xx status into an error
/// that carries whatever detail the server put in the body.
async fn read_body(resp: reqwest::Response) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if !status.is_success() {
        return Err(ApiError::from_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            &body,
        ));
    }
    Ok(body)
}

/// The search endpoint has returned both a bare list and `{"hits": [...]}`
/// over time; accept either and skip elements that do not decode.
fn hits_from_value(value: Value) -> Vec<MetaHit> {
    let hits = match value {
        Value::Array(hits) => hits,
        Value::Object(mut map) => match map.remove("hits") {
            Some(Value::Array(hits)) => hits,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    hits.into_iter()
        .filter_map(|hit| serde_json::from_value(hit).ok())
        .collect()
}

fn build_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
