//! Direct object-store transfer for one part.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

/// Transmits one part's bytes to a presigned object-store URL.
#[async_trait]
pub trait PartTransport: Send + Sync {
    /// PUT the raw byte range and return the ETag receipt.
    async fn put_part(&self, url: &str, content_type: &str, body: Bytes) -> Result<String>;
}

/// Plain HTTP PUT straight to object storage.
///
/// Uses its own bare client rather than the backend's: the presigned URL is
/// the sole credential, and adding the backend's Authorization header would
/// double-sign the request and get it rejected.
pub struct HttpPartTransport {
    client: Client,
}

impl HttpPartTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create object-store HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PartTransport for HttpPartTransport {
    async fn put_part(&self, url: &str, content_type: &str, body: Bytes) -> Result<String> {
        let size = body.len();
        let response = self
            .client
            .put(url)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .context("Object-store PUT failed to send")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Object-store PUT failed with status {}", status));
        }

        // Header lookup is case-insensitive; providers vary between "ETag"
        // and "etag".
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Object-store response carried no ETag header"))?;

        tracing::debug!(size_bytes = size, etag = %etag, "Part transmitted");

        Ok(etag)
    }
}
