//! Scripted doubles for the upload pipeline seams.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use lectern_api_client::{InitiateUploadRequest, InitiateUploadResponse};
use lectern_core::models::{CompletedPart, VideoStatus};
use lectern_upload::probe::{MediaInfo, MediaInspector};
use lectern_upload::traits::{StatusApi, UploadApi};
use lectern_upload::transport::PartTransport;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Backend double that counts every control-plane call.
#[derive(Default)]
pub struct MockUploadApi {
    pub initiate_calls: AtomicU32,
    pub url_calls: AtomicU32,
    pub complete_calls: AtomicU32,
    /// Part numbers in the order URLs were requested.
    pub url_sequence: Mutex<Vec<u32>>,
    /// Payload received by complete_upload.
    pub completed_parts: Mutex<Option<Vec<CompletedPart>>>,
    /// What recorded_parts returns (resume reconciliation).
    pub recorded: Mutex<Vec<CompletedPart>>,
    /// Fail the presigned-URL request for this part number.
    pub fail_url_for_part: Option<u32>,
}

#[async_trait]
impl UploadApi for MockUploadApi {
    async fn initiate_upload(
        &self,
        _request: &InitiateUploadRequest,
    ) -> anyhow::Result<InitiateUploadResponse> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(InitiateUploadResponse {
            video_id: "vid-1".to_string(),
            upload_id: "up-1".to_string(),
            presigned_url: None,
            s3_key: "media/vid-1.mp4".to_string(),
        })
    }

    async fn part_upload_url(
        &self,
        _video_id: &str,
        part_number: u32,
        _content_length: u64,
    ) -> anyhow::Result<String> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        self.url_sequence.lock().unwrap().push(part_number);
        if self.fail_url_for_part == Some(part_number) {
            anyhow::bail!("presigned URL request refused for part {part_number}");
        }
        Ok(format!("https://store.example.com/vid-1/part/{part_number}"))
    }

    async fn complete_upload(
        &self,
        _video_id: &str,
        parts: Vec<CompletedPart>,
    ) -> anyhow::Result<()> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        *self.completed_parts.lock().unwrap() = Some(parts);
        Ok(())
    }

    async fn recorded_parts(&self, _video_id: &str) -> anyhow::Result<Vec<CompletedPart>> {
        Ok(self.recorded.lock().unwrap().clone())
    }
}

/// Object-store double.
#[derive(Default)]
pub struct MockTransport {
    pub put_calls: AtomicU32,
    /// Fail the PUT whose URL ends with this part number, once per attempt.
    pub fail_url_suffix: Option<String>,
}

#[async_trait]
impl PartTransport for MockTransport {
    async fn put_part(&self, url: &str, _content_type: &str, body: Bytes) -> anyhow::Result<String> {
        let call = self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(suffix) = &self.fail_url_suffix {
            if url.ends_with(suffix.as_str()) {
                anyhow::bail!("connection reset during PUT");
            }
        }
        Ok(format!("\"etag-{}-{}\"", call + 1, body.len()))
    }
}

/// Inspector that reports a fixed duration and the file's real size.
pub struct StubInspector {
    pub duration: Duration,
    pub probe_calls: AtomicU32,
}

impl StubInspector {
    pub fn seconds(secs: u64) -> Self {
        Self {
            duration: Duration::from_secs(secs),
            probe_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl MediaInspector for StubInspector {
    async fn probe(&self, path: &Path) -> anyhow::Result<MediaInfo> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let file_size = std::fs::metadata(path)?.len();
        Ok(MediaInfo {
            duration: self.duration,
            mime_type: lectern_upload::probe::mime_for_path(path),
            file_size,
        })
    }
}

/// Status double that replays a fixed script, repeating the last entry.
pub struct ScriptedStatusApi {
    pub calls: AtomicU32,
    pub script: Vec<(VideoStatus, Option<String>)>,
}

impl ScriptedStatusApi {
    pub fn new(script: Vec<(VideoStatus, Option<String>)>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            script,
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusApi for ScriptedStatusApi {
    async fn video_status(
        &self,
        _video_id: &str,
    ) -> anyhow::Result<(VideoStatus, Option<String>)> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let entry = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .expect("script must not be empty");
        Ok(entry.clone())
    }
}
