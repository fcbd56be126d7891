//! Lesson-side video reference.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Transcode lifecycle of an uploaded video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }
}

impl Display for VideoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoStatus::Uploading => write!(f, "uploading"),
            VideoStatus::Processing => write!(f, "processing"),
            VideoStatus::Ready => write!(f, "ready"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A lesson's pointer to its video.
///
/// At most one of `video_id` / `youtube_url` drives playback at a time, and
/// `manifest_url` is only present once the status is `Ready`. The lesson
/// entity owns this struct; the encode watcher writes to these fields and
/// nothing else on the lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonVideoRef {
    #[serde(rename = "video_s3", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(rename = "video_s3_url", skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(rename = "video_s3_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
}

impl LessonVideoRef {
    /// Reference a freshly uploaded video awaiting transcode. Clears any
    /// embedded alternative so only one source drives playback.
    pub fn uploaded(video_id: String) -> Self {
        Self {
            video_id: Some(video_id),
            manifest_url: None,
            status: Some(VideoStatus::Processing),
            youtube_url: None,
        }
    }

    /// Reference an embedded third-party video instead of an upload.
    pub fn embedded(youtube_url: String) -> Self {
        Self {
            video_id: None,
            manifest_url: None,
            status: None,
            youtube_url: Some(youtube_url),
        }
    }

    /// Transcode finished; attach the manifest URL.
    pub fn mark_ready(&mut self, manifest_url: String) {
        self.manifest_url = Some(manifest_url);
        self.status = Some(VideoStatus::Ready);
    }

    /// Transcode failed; the manifest stays absent.
    pub fn mark_failed(&mut self) {
        self.manifest_url = None;
        self.status = Some(VideoStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_lowercase() {
        let s: VideoStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(s, VideoStatus::Processing);
        assert_eq!(serde_json::to_string(&VideoStatus::Ready).unwrap(), "\"ready\"");
        assert_eq!(VideoStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!VideoStatus::Uploading.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
    }

    #[test]
    fn uploaded_ref_clears_embed() {
        let mut r = LessonVideoRef::embedded("https://youtu.be/dQw4w9WgXcQ".to_string());
        r = LessonVideoRef::uploaded("vid-1".to_string());
        assert_eq!(r.video_id.as_deref(), Some("vid-1"));
        assert!(r.youtube_url.is_none());
        assert!(r.manifest_url.is_none());
        assert_eq!(r.status, Some(VideoStatus::Processing));
    }

    #[test]
    fn ready_attaches_manifest() {
        let mut r = LessonVideoRef::uploaded("vid-1".to_string());
        r.mark_ready("https://cdn.example.com/vid-1/master.m3u8".to_string());
        assert_eq!(r.status, Some(VideoStatus::Ready));
        assert!(r.manifest_url.as_deref().unwrap().ends_with("master.m3u8"));
    }

    #[test]
    fn failed_keeps_manifest_absent() {
        let mut r = LessonVideoRef::uploaded("vid-1".to_string());
        r.mark_failed();
        assert_eq!(r.status, Some(VideoStatus::Failed));
        assert!(r.manifest_url.is_none());
    }

    #[test]
    fn wire_field_names() {
        let r = LessonVideoRef::uploaded("vid-1".to_string());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["video_s3"], "vid-1");
        assert_eq!(json["video_s3_status"], "processing");
        assert!(json.get("video_s3_url").is_none());
    }
}
