//! Upload coordinator: validate, initiate, transfer parts, finalize.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use lectern_api_client::InitiateUploadRequest;
use lectern_core::models::{CompletedPart, FileFingerprint, UploadSession};
use lectern_core::PipelineConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::watch;

use crate::error::UploadError;
use crate::probe::{MediaInfo, MediaInspector};
use crate::resume::{fingerprint_of, PersistedSession, SessionStore};
use crate::traits::{PartSink, UploadApi};
use crate::transport::PartTransport;

/// Pre-network verdict on a local file.
#[derive(Debug, Clone)]
pub enum Validation {
    Accepted(MediaInfo),
    /// The reason is a user-facing string, shown inline next to the picker.
    Rejected(String),
}

/// Requests the part-scoped presigned URL, then transmits the bytes straight
/// to object storage. The URL is single-use; every call requests a fresh one.
pub struct DirectPartSink {
    api: Arc<dyn UploadApi>,
    transport: Arc<dyn PartTransport>,
}

impl DirectPartSink {
    pub fn new(api: Arc<dyn UploadApi>, transport: Arc<dyn PartTransport>) -> Self {
        Self { api, transport }
    }
}

#[async_trait]
impl PartSink for DirectPartSink {
    async fn upload_part(
        &self,
        video_id: &str,
        part_number: u32,
        content_type: &str,
        body: Bytes,
    ) -> Result<CompletedPart, UploadError> {
        let url = self
            .api
            .part_upload_url(video_id, part_number, body.len() as u64)
            .await
            .map_err(|source| UploadError::Transfer {
                part_number,
                source,
            })?;

        let etag = self
            .transport
            .put_part(&url, content_type, body)
            .await
            .map_err(|source| UploadError::Transfer {
                part_number,
                source,
            })?;

        Ok(CompletedPart { part_number, etag })
    }
}

/// Drives one file through the multipart upload flow.
///
/// Progress is published on a watch channel as an integer percentage,
/// strictly after each part's receipt is recorded.
pub struct UploadCoordinator {
    api: Arc<dyn UploadApi>,
    sink: Arc<dyn PartSink>,
    inspector: Arc<dyn MediaInspector>,
    store: Option<Arc<dyn SessionStore>>,
    config: PipelineConfig,
    progress: watch::Sender<u8>,
}

impl UploadCoordinator {
    pub fn new(
        api: Arc<dyn UploadApi>,
        sink: Arc<dyn PartSink>,
        inspector: Arc<dyn MediaInspector>,
        config: PipelineConfig,
    ) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            api,
            sink,
            inspector,
            store: None,
            config,
            progress,
        }
    }

    /// Persist the session after every recorded part so an interrupted
    /// upload can be picked up by [`UploadCoordinator::resume`].
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Subscribe to upload progress, in [0, 100].
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Probe the file locally and decide whether it can be uploaded at all.
    /// No network traffic happens here.
    pub async fn validate(&self, path: &Path) -> Validation {
        let info = match self.inspector.probe(path).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Metadata probe failed");
                return Validation::Rejected(
                    "Could not determine video length. Try a different file.".to_string(),
                );
            }
        };

        if !info.mime_type.starts_with("video/") {
            return Validation::Rejected(
                "Please select a valid video file (mp4, webm, etc.)".to_string(),
            );
        }

        let ceiling = self.config.max_video_duration;
        if info.duration > ceiling {
            return Validation::Rejected(format!(
                "Video is {}s long. Maximum is {}s ({} minutes). \
                 Use an embedded video for longer content.",
                info.duration.as_secs_f64().round() as u64,
                ceiling.as_secs(),
                ceiling.as_secs() / 60,
            ));
        }

        Validation::Accepted(info)
    }

    /// Upload one file end to end. Returns the backend-issued video id.
    pub async fn upload(&self, path: &Path, title: &str) -> Result<String, UploadError> {
        let info = match self.validate(path).await {
            Validation::Accepted(info) => info,
            Validation::Rejected(reason) => return Err(UploadError::Validation(reason)),
        };

        self.progress.send_replace(0);

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();

        let initiated = self
            .api
            .initiate_upload(&InitiateUploadRequest {
                title: title.to_string(),
                description: String::new(),
                file_name,
                file_size: info.file_size,
                file_type: info.mime_type.clone(),
                duration: info.duration.as_secs_f64(),
            })
            .await
            .map_err(UploadError::Initiate)?;

        let mut session = UploadSession::new(
            initiated.video_id,
            initiated.upload_id,
            initiated.s3_key,
            self.config.part_size_bytes,
            info.file_size,
        );

        let fingerprint = self.store.as_ref().and_then(|_| fingerprint_of(path).ok());
        self.persist(&session, &info.mime_type, fingerprint.as_ref());

        self.transfer_parts(
            &mut session,
            path,
            &info.mime_type,
            info.file_size,
            fingerprint.as_ref(),
        )
        .await?;
        self.finalize(session, fingerprint.as_ref()).await
    }

    /// Explicit resume path: reconcile a persisted session against the parts
    /// the backend already recorded, then continue from the first missing
    /// part. Falls back to a fresh upload when there is nothing to resume.
    pub async fn resume(&self, path: &Path, title: &str) -> Result<String, UploadError> {
        let Some(store) = self.store.clone() else {
            return self.upload(path, title).await;
        };

        let fingerprint = fingerprint_of(path).map_err(UploadError::Initiate)?;
        let Some(snapshot) = store.load(&fingerprint).map_err(UploadError::Initiate)? else {
            return self.upload(path, title).await;
        };

        let mut session = snapshot.session;
        let content_type = snapshot.content_type;

        // The backend's receipt list is authoritative; our snapshot may be
        // behind it (part landed, crash before save) or ahead of it (save
        // raced a failed transfer).
        let recorded = self
            .api
            .recorded_parts(&session.video_id)
            .await
            .map_err(UploadError::Initiate)?;

        if !is_contiguous_prefix(&recorded) {
            tracing::warn!(
                video_id = %session.video_id,
                recorded = recorded.len(),
                "Backend part list is not a clean prefix, restarting upload"
            );
            store.remove(&fingerprint).map_err(UploadError::Initiate)?;
            return self.upload(path, title).await;
        }
        session.parts = recorded;

        tracing::info!(
            video_id = %session.video_id,
            resumed_parts = session.parts.len(),
            total_parts = session.total_parts,
            "Resuming upload"
        );

        self.progress.send_replace(session.progress_percent());

        self.transfer_parts(
            &mut session,
            path,
            &content_type,
            fingerprint.size,
            Some(&fingerprint),
        )
        .await?;
        self.finalize(session, Some(&fingerprint)).await
    }

    /// Transmit every outstanding part in order, recording receipts as they
    /// arrive. Any part failure aborts the remaining sequence.
    async fn transfer_parts(
        &self,
        session: &mut UploadSession,
        path: &Path,
        content_type: &str,
        file_size: u64,
        fingerprint: Option<&FileFingerprint>,
    ) -> Result<(), UploadError> {
        let mut file = tokio::fs::File::open(path).await?;

        while !session.is_complete() {
            let part_number = session.next_part_number();
            let (start, end) = session.part_range(part_number, file_size);

            file.seek(SeekFrom::Start(start)).await?;
            let mut buffer = vec![0u8; (end - start) as usize];
            file.read_exact(&mut buffer).await?;

            let receipt = self
                .sink
                .upload_part(
                    &session.video_id,
                    part_number,
                    content_type,
                    Bytes::from(buffer),
                )
                .await?;

            session.record_part(receipt)?;
            self.persist(session, content_type, fingerprint);
            self.progress.send_replace(session.progress_percent());

            tracing::debug!(
                video_id = %session.video_id,
                part_number = part_number,
                progress = session.progress_percent(),
                "Part receipt recorded"
            );
        }

        Ok(())
    }

    async fn finalize(
        &self,
        session: UploadSession,
        fingerprint: Option<&FileFingerprint>,
    ) -> Result<String, UploadError> {
        let UploadSession {
            video_id, parts, ..
        } = session;

        self.api
            .complete_upload(&video_id, parts)
            .await
            .map_err(UploadError::Finalize)?;

        if let (Some(store), Some(fingerprint)) = (&self.store, fingerprint) {
            if let Err(e) = store.remove(fingerprint) {
                tracing::warn!(video_id = %video_id, error = %e, "Failed to drop session snapshot");
            }
        }

        Ok(video_id)
    }

    /// Persist failures must not kill an otherwise healthy upload.
    fn persist(
        &self,
        session: &UploadSession,
        content_type: &str,
        fingerprint: Option<&FileFingerprint>,
    ) {
        let (Some(store), Some(fingerprint)) = (&self.store, fingerprint) else {
            return;
        };
        let snapshot = PersistedSession {
            fingerprint: fingerprint.clone(),
            session: session.clone(),
            content_type: content_type.to_string(),
            saved_at: Utc::now(),
        };
        if let Err(e) = store.save(&snapshot) {
            tracing::warn!(video_id = %session.video_id, error = %e, "Failed to persist session");
        }
    }
}

/// True when `parts` is exactly 1..=N in order with no gaps.
fn is_contiguous_prefix(parts: &[CompletedPart]) -> bool {
    parts
        .iter()
        .enumerate()
        .all(|(i, p)| p.part_number == i as u32 + 1)
}
