//! Shared HTTP client for the course backend.
//!
//! Provides a minimal client with bearer-token auth, generic GET/POST
//! helpers, and the video-pipeline domain methods (initiate, per-part URLs,
//! finalize, status, signed playback URLs). The upload and playback crates
//! use this client directly.

pub mod api;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the course backend.
///
/// Every request carries `Authorization: Bearer {token}` from local session
/// state. The direct-to-object-store part PUT deliberately does not go
/// through this client; see the upload crate's transport.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create client from environment: LECTERN_API_URL (or API_URL) and
    /// LECTERN_ACCESS_TOKEN (or ACCESS_TOKEN).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("LECTERN_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:8000/api".to_string());

        let token = std::env::var("LECTERN_ACCESS_TOKEN")
            .or_else(|_| std::env::var("ACCESS_TOKEN"))
            .context("Missing access token. Set LECTERN_ACCESS_TOKEN or ACCESS_TOKEN")?;

        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.token))
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.get(&url));

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// Raw client for requests outside the backend surface.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub use api::{
    CompleteUploadRequest, InitiateUploadRequest, InitiateUploadResponse, PartUrlRequest,
    PartUrlResponse, RecordedPartsResponse, SignedUrlResponse, VideoStatusResponse,
};
