//! Remote background removal over HTTP.
//!
//! Sends the decoded image as `image/png` in a POST body and expects the
//! processed image back as the response body. PNG is preferred; any other
//! image format the service answers with is re-encoded to PNG. Error
//! responses may carry a JSON `{"error": "..."}` body, which is surfaced in
//! the failure message.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::{BackgroundRemover, encode_png, ensure_png};
use crate::decoder::DecodedImage;

/// Responses larger than this are refused.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpRemoverConfig {
    pub endpoint: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub max_response_bytes: usize,
    /// Honour `HTTP_PROXY` and friends.
    pub use_system_proxy: bool,
}

impl HttpRemoverConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            max_response_bytes: MAX_RESPONSE_BYTES,
            use_system_proxy: true,
        }
    }
}

pub struct HttpRemover {
    client: reqwest::Client,
    config: HttpRemoverConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRemover {
    pub fn new(config: HttpRemoverConfig) -> Result<Self> {
        if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
            bail!("remover endpoint must be an http(s) URL: {}", config.endpoint);
        }
        let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl BackgroundRemover for HttpRemover {
    fn name(&self) -> &str {
        "http"
    }

    async fn remove(&self, image: &DecodedImage) -> Result<Vec<u8>> {
        let source = Arc::clone(&image.image);
        let body = tokio::task::spawn_blocking(move || encode_png(&source))
            .await
            .context("encode task panicked")??;
        debug!(endpoint = %self.config.endpoint, bytes = body.len(), "posting image");

        let mut req = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", "image/png")
            .header("accept", "image/png, image/*;q=0.8");
        if let Some(key) = &self.config.api_key {
            req = req.header("authorization", format!("Bearer {}", key));
        }

        let resp = req.body(body).send().await.context("request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            bail!("remover returned {}: {}", status, detail);
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            bail!("remover returned non-image content ({content_type})");
        }

        let limit = self.config.max_response_bytes;
        let mut out = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("failed to read response body")?;
            if out.len() + chunk.len() > limit {
                bail!("remover response exceeds {} bytes", limit);
            }
            out.extend_from_slice(&chunk);
        }

        if out.is_empty() {
            bail!("remover returned an empty body");
        }
        if !content_type.starts_with("image/png") {
            debug!(%content_type, "re-encoding remover response as PNG");
        }
        tokio::task::spawn_blocking(move || ensure_png(out))
            .await
            .context("re-encode task panicked")?
    }
}
