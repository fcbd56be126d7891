//! Signed playback resolution.

use async_trait::async_trait;
use lectern_api_client::{ApiClient, SignedUrlResponse};
use lectern_core::models::SignedAccess;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ResolutionError;

/// The one backend call the resolver makes.
#[async_trait]
pub trait SignedUrlApi: Send + Sync {
    async fn signed_url(&self, video_id: &str) -> anyhow::Result<SignedUrlResponse>;
}

#[async_trait]
impl SignedUrlApi for ApiClient {
    async fn signed_url(&self, video_id: &str) -> anyhow::Result<SignedUrlResponse> {
        ApiClient::signed_url(self, video_id).await
    }
}

/// Resolves an opaque video id into a short-lived playback credential.
///
/// Stateless across calls: there is no cache and no self-refresh. Callers
/// re-resolve whenever the active lesson changes, the previous credential
/// expired, or playback is retried after an error.
pub struct SignedPlaybackResolver {
    api: Arc<dyn SignedUrlApi>,
}

impl SignedPlaybackResolver {
    pub fn new(api: Arc<dyn SignedUrlApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, video_id: &str) -> Result<SignedAccess, ResolutionError> {
        let response = self
            .api
            .signed_url(video_id)
            .await
            .map_err(ResolutionError)?;

        let mut custom_headers = HashMap::new();
        if let (Some(name), Some(value)) = (&response.header_name, &response.auth_header) {
            custom_headers.insert(name.clone(), value.clone());
        }

        let expires_in = Duration::from_secs(response.expires_in_hours * 3600);

        tracing::debug!(
            video_id = %video_id,
            expires_in_hours = response.expires_in_hours,
            has_auth_header = !custom_headers.is_empty(),
            "Playback credential issued"
        );

        Ok(SignedAccess::new(response.url, custom_headers, expires_in))
    }
}
