//! Domain methods and wire types for the video pipeline endpoints.
//!
//! Request/response shapes match the backend handlers; `CompletedPart` and
//! `VideoStatus` are shared with `lectern_core::models`.

use crate::ApiClient;
use anyhow::Result;
use lectern_core::models::{CompletedPart, VideoStatus};
use serde::{Deserialize, Serialize};

/// POST /videos/initiate_upload/
#[derive(Debug, Serialize)]
pub struct InitiateUploadRequest {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    /// Probed duration in seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateUploadResponse {
    pub video_id: String,
    pub upload_id: String,
    /// Presigned URL for single-shot uploads; the chunked path ignores it
    /// and requests one URL per part instead.
    pub presigned_url: Option<String>,
    pub s3_key: String,
}

/// POST /videos/get_presigned_url/
#[derive(Debug, Serialize)]
pub struct PartUrlRequest {
    pub video_id: String,
    pub part_number: u32,
    pub content_length: u64,
}

#[derive(Debug, Deserialize)]
pub struct PartUrlResponse {
    pub presigned_url: String,
}

/// POST /videos/complete_upload/
#[derive(Debug, Serialize)]
pub struct CompleteUploadRequest {
    pub video_id: String,
    pub parts: Vec<CompletedPart>,
}

/// GET /videos/{video_id}/
#[derive(Debug, Clone, Deserialize)]
pub struct VideoStatusResponse {
    pub id: String,
    pub status: VideoStatus,
    pub cloudfront_url: Option<String>,
}

/// GET /videos/{video_id}/signed_url/
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlResponse {
    pub url: String,
    pub auth_header: Option<String>,
    pub header_name: Option<String>,
    pub expires_in_hours: u64,
    pub video_id: String,
    pub title: Option<String>,
}

/// GET /videos/{video_id}/parts/ — parts the backend has already recorded,
/// consumed by the resumable-upload reconciliation step.
#[derive(Debug, Deserialize)]
pub struct RecordedPartsResponse {
    pub parts: Vec<CompletedPart>,
}

/// The backend HTML-escapes some presigned URLs when they pass through its
/// serializer; query separators come back as `&amp;` and must be restored
/// before the URL is usable.
fn decode_entities(url: &str) -> String {
    if url.contains("&amp;") {
        url.replace("&amp;", "&")
    } else {
        url.to_string()
    }
}

impl ApiClient {
    /// Open a multipart upload for one video file.
    pub async fn initiate_upload(
        &self,
        request: &InitiateUploadRequest,
    ) -> Result<InitiateUploadResponse> {
        let response: InitiateUploadResponse =
            self.post_json("/videos/initiate_upload/", request).await?;

        tracing::info!(
            video_id = %response.video_id,
            upload_id = %response.upload_id,
            file_name = %request.file_name,
            file_size = request.file_size,
            "Upload initiated"
        );

        Ok(response)
    }

    /// Request a presigned URL scoped to exactly one part.
    pub async fn part_upload_url(
        &self,
        video_id: &str,
        part_number: u32,
        content_length: u64,
    ) -> Result<String> {
        let request = PartUrlRequest {
            video_id: video_id.to_string(),
            part_number,
            content_length,
        };
        let response: PartUrlResponse = self
            .post_json("/videos/get_presigned_url/", &request)
            .await?;

        Ok(decode_entities(&response.presigned_url))
    }

    /// Finalize a multipart upload with the complete ordered parts list.
    /// The backend completes the upload server-side and queues transcoding.
    pub async fn complete_upload(&self, video_id: &str, parts: Vec<CompletedPart>) -> Result<()> {
        let request = CompleteUploadRequest {
            video_id: video_id.to_string(),
            parts,
        };
        let _: serde_json::Value = self.post_json("/videos/complete_upload/", &request).await?;

        tracing::info!(video_id = %video_id, "Upload finalized");
        Ok(())
    }

    /// Fetch the transcode status of one video.
    pub async fn video_status(&self, video_id: &str) -> Result<VideoStatusResponse> {
        self.get(&format!("/videos/{}/", video_id)).await
    }

    /// Fetch a short-lived signed manifest URL plus auxiliary auth header.
    pub async fn signed_url(&self, video_id: &str) -> Result<SignedUrlResponse> {
        self.get(&format!("/videos/{}/signed_url/", video_id)).await
    }

    /// Parts the backend has recorded for an interrupted upload.
    pub async fn recorded_parts(&self, video_id: &str) -> Result<Vec<CompletedPart>> {
        let response: RecordedPartsResponse =
            self.get(&format!("/videos/{}/parts/", video_id)).await?;
        Ok(response.parts)
    }
}
