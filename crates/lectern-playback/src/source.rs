//! Playback source selection and URL classification.

use lectern_core::models::{LessonVideoRef, SignedAccess};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// What a lesson offers the player, in resolved form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Adaptive manifest, with any auth headers its segment requests need.
    Manifest {
        url: String,
        headers: HashMap<String, String>,
    },
    /// Plain progressive file; no ladder.
    DirectFile { url: String },
    /// Third-party video, rendered through a restricted embed.
    Embed { embed_url: String },
    /// URL present but in no shape the player recognizes.
    Unrecognized { url: String },
    /// Lesson has no video at all.
    None,
}

/// Pick the lesson's playback source, highest priority first: signed manifest
/// URL, then the raw manifest/file URL, then the embedded third-party
/// reference, then nothing.
pub fn select_source(video_ref: &LessonVideoRef, signed: Option<&SignedAccess>) -> PlaybackSource {
    if video_ref.video_id.is_some() {
        if let Some(access) = signed {
            return classify(&access.url, access.custom_headers.clone());
        }
    }
    if let Some(url) = &video_ref.manifest_url {
        return classify(url, HashMap::new());
    }
    if let Some(url) = &video_ref.youtube_url {
        return match extract_youtube_id(url) {
            Some(id) => PlaybackSource::Embed {
                embed_url: restricted_embed_url(&id),
            },
            None => PlaybackSource::Unrecognized { url: url.clone() },
        };
    }
    PlaybackSource::None
}

/// Classify a URL into its playback code path.
pub fn classify(url: &str, headers: HashMap<String, String>) -> PlaybackSource {
    if let Some(id) = extract_youtube_id(url) {
        return PlaybackSource::Embed {
            embed_url: restricted_embed_url(&id),
        };
    }
    if looks_like_manifest(url) {
        return PlaybackSource::Manifest {
            url: url.to_string(),
            headers,
        };
    }
    if looks_like_direct_file(url) {
        return PlaybackSource::DirectFile {
            url: url.to_string(),
        };
    }
    PlaybackSource::Unrecognized {
        url: url.to_string(),
    }
}

fn looks_like_manifest(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\.m3u8(\?.*)?$").expect("manifest regex"));
    re.is_match(url) || url.contains("m3u8")
}

fn looks_like_direct_file(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\.(mp4|webm|ogg|mov|m4v)(\?.*)?$").expect("direct file regex")
    });
    re.is_match(url)
}

/// Extract the 11-character YouTube video id from watch, short, or embed
/// URL forms.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:youtu\.be/|youtube(?:-nocookie)?\.com/(?:watch\?v=|embed/|v/))([A-Za-z0-9_-]{11})")
            .expect("youtube id regex")
    });
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Embed URL with autoplay disabled, related content suppressed, and
/// branding kept minimal, served from the no-cookie host.
pub fn restricted_embed_url(video_id: &str) -> String {
    format!(
        "https://www.youtube-nocookie.com/embed/{video_id}\
         ?autoplay=0&controls=1&rel=0&modestbranding=1&iv_load_policy=3\
         &fs=1&playsinline=1&enablejsapi=0"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_manifest_wins_over_raw_url() {
        let video_ref = LessonVideoRef {
            video_id: Some("vid-1".to_string()),
            manifest_url: Some("https://cdn.example.com/raw/master.m3u8".to_string()),
            status: None,
            youtube_url: None,
        };
        let access = SignedAccess::new(
            "https://cdn.example.com/signed/master.m3u8?sig=x".to_string(),
            HashMap::from([("X-Playback-Auth".to_string(), "t".to_string())]),
            std::time::Duration::from_secs(3600),
        );

        match select_source(&video_ref, Some(&access)) {
            PlaybackSource::Manifest { url, headers } => {
                assert!(url.contains("signed"));
                assert_eq!(headers.len(), 1);
            }
            other => panic!("expected manifest, got {other:?}"),
        }
    }

    #[test]
    fn raw_manifest_is_fallback_when_signing_unavailable() {
        let video_ref = LessonVideoRef {
            video_id: Some("vid-1".to_string()),
            manifest_url: Some("https://cdn.example.com/raw/master.m3u8".to_string()),
            status: None,
            youtube_url: None,
        };
        match select_source(&video_ref, None) {
            PlaybackSource::Manifest { url, headers } => {
                assert!(url.contains("raw"));
                assert!(headers.is_empty());
            }
            other => panic!("expected manifest, got {other:?}"),
        }
    }

    #[test]
    fn youtube_reference_becomes_restricted_embed() {
        let video_ref =
            LessonVideoRef::embedded("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());
        match select_source(&video_ref, None) {
            PlaybackSource::Embed { embed_url } => {
                assert!(embed_url.starts_with("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"));
                assert!(embed_url.contains("autoplay=0"));
                assert!(embed_url.contains("rel=0"));
                assert!(embed_url.contains("modestbranding=1"));
            }
            other => panic!("expected embed, got {other:?}"),
        }
    }

    #[test]
    fn lesson_without_video_yields_none() {
        assert_eq!(
            select_source(&LessonVideoRef::default(), None),
            PlaybackSource::None
        );
    }

    #[test]
    fn classify_distinguishes_manifest_file_and_unknown() {
        assert!(matches!(
            classify("https://cdn.example.com/v/master.m3u8?sig=1", HashMap::new()),
            PlaybackSource::Manifest { .. }
        ));
        assert!(matches!(
            classify("https://cdn.example.com/v/lecture.MP4", HashMap::new()),
            PlaybackSource::DirectFile { .. }
        ));
        assert!(matches!(
            classify("https://cdn.example.com/v/lecture.webm", HashMap::new()),
            PlaybackSource::DirectFile { .. }
        ));
        assert!(matches!(
            classify("https://example.com/page.html", HashMap::new()),
            PlaybackSource::Unrecognized { .. }
        ));
    }

    #[test]
    fn youtube_id_extraction_covers_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_youtube_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
        assert_eq!(extract_youtube_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_youtube_id("https://vimeo.com/12345678901"), None);
    }
}
