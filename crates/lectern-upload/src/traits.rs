//! Trait seams between the upload pipeline and its collaborators.
//!
//! The coordinator and watcher depend on these rather than on the concrete
//! HTTP client, so tests can substitute scripted doubles and count calls.

use async_trait::async_trait;
use bytes::Bytes;
use lectern_api_client::{ApiClient, InitiateUploadRequest, InitiateUploadResponse};
use lectern_core::models::{CompletedPart, VideoStatus};
use uuid::Uuid;

use crate::error::UploadError;

/// Control-plane calls the coordinator makes against the backend.
#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn initiate_upload(
        &self,
        request: &InitiateUploadRequest,
    ) -> anyhow::Result<InitiateUploadResponse>;

    /// Presigned URL scoped to exactly one part, bounded by `content_length`.
    async fn part_upload_url(
        &self,
        video_id: &str,
        part_number: u32,
        content_length: u64,
    ) -> anyhow::Result<String>;

    async fn complete_upload(
        &self,
        video_id: &str,
        parts: Vec<CompletedPart>,
    ) -> anyhow::Result<()>;

    /// Parts the backend already holds receipts for (resume reconciliation).
    async fn recorded_parts(&self, video_id: &str) -> anyhow::Result<Vec<CompletedPart>>;
}

/// Transcode-status calls the watcher makes against the backend.
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Current status plus the manifest URL once the video is ready.
    async fn video_status(&self, video_id: &str)
        -> anyhow::Result<(VideoStatus, Option<String>)>;
}

/// One part's journey: presigned URL request plus the direct object-store PUT.
///
/// Implemented directly by [`crate::coordinator::DirectPartSink`] and wrapped
/// by [`crate::retry::RetryingSink`] for bounded per-part retry.
#[async_trait]
pub trait PartSink: Send + Sync {
    async fn upload_part(
        &self,
        video_id: &str,
        part_number: u32,
        content_type: &str,
        body: Bytes,
    ) -> Result<CompletedPart, UploadError>;
}

/// The slice of the lesson model the watcher is allowed to write.
///
/// Implementations must only touch the lesson's video-reference fields so a
/// watcher write can never clobber concurrent user edits elsewhere on the
/// lesson.
pub trait LessonStore: Send + Sync {
    fn apply_ready(&self, lesson_id: Uuid, video_id: &str, manifest_url: &str);
    fn apply_failed(&self, lesson_id: Uuid, video_id: &str);
}

#[async_trait]
impl UploadApi for ApiClient {
    async fn initiate_upload(
        &self,
        request: &InitiateUploadRequest,
    ) -> anyhow::Result<InitiateUploadResponse> {
        ApiClient::initiate_upload(self, request).await
    }

    async fn part_upload_url(
        &self,
        video_id: &str,
        part_number: u32,
        content_length: u64,
    ) -> anyhow::Result<String> {
        ApiClient::part_upload_url(self, video_id, part_number, content_length).await
    }

    async fn complete_upload(
        &self,
        video_id: &str,
        parts: Vec<CompletedPart>,
    ) -> anyhow::Result<()> {
        ApiClient::complete_upload(self, video_id, parts).await
    }

    async fn recorded_parts(&self, video_id: &str) -> anyhow::Result<Vec<CompletedPart>> {
        ApiClient::recorded_parts(self, video_id).await
    }
}

#[async_trait]
impl StatusApi for ApiClient {
    async fn video_status(
        &self,
        video_id: &str,
    ) -> anyhow::Result<(VideoStatus, Option<String>)> {
        let response = ApiClient::video_status(self, video_id).await?;
        Ok((response.status, response.cloudfront_url))
    }
}
