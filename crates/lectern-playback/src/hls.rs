//! Software adaptive-bitrate client over HLS master manifests.
//!
//! Fetches the master playlist, parses its variant streams into a quality
//! ladder sorted by descending resolution, and tracks the pinned rung. The
//! media surface consumes the selected variant; segment scheduling is the
//! platform's job.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lectern_core::models::{QualityLevel, AUTO_LEVEL};
use std::collections::HashMap;

use crate::engine::AdaptiveClient;
use crate::error::PlaybackError;

/// One `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

/// Parse a master playlist into its variant streams.
///
/// Returns an error for content that is not an HLS playlist; a playlist with
/// zero variants (a media playlist) is the caller's problem to reject.
pub fn parse_master_playlist(text: &str) -> anyhow::Result<Vec<VariantStream>> {
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some("#EXTM3U") {
        return Err(anyhow!("Not an HLS playlist: missing #EXTM3U header"));
    }

    let mut variants = Vec::new();
    let mut pending: Option<(u64, u32, u32)> = None;

    for line in lines {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let attrs = parse_attributes(attrs);
            let bandwidth = attrs
                .get("BANDWIDTH")
                .and_then(|v| v.parse::<u64>().ok())
                .context("Variant stream is missing BANDWIDTH")?;
            let (width, height) = attrs
                .get("RESOLUTION")
                .and_then(|v| v.split_once('x'))
                .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
                .unwrap_or((0, 0));
            pending = Some((bandwidth, width, height));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some((bandwidth, width, height)) = pending.take() {
                variants.push(VariantStream {
                    bandwidth,
                    width,
                    height,
                    uri: line.to_string(),
                });
            }
        }
    }

    Ok(variants)
}

/// Split an attribute list on commas that are not inside quoted values.
fn parse_attributes(attrs: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut push = |chunk: &str, map: &mut HashMap<String, String>| {
        if let Some((key, value)) = chunk.split_once('=') {
            map.insert(key.trim().to_string(), value.trim_matches('"').to_string());
        }
    };

    for c in attrs.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                push(&current, &mut map);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push(&current, &mut map);

    map
}

/// Sort variants into ladder order (descending resolution, ties broken by
/// bandwidth) and derive the quality ladder, so rung index selects directly.
fn build_ladder(variants: &mut [VariantStream]) -> Vec<QualityLevel> {
    variants.sort_by(|a, b| {
        b.height
            .cmp(&a.height)
            .then(b.bandwidth.cmp(&a.bandwidth))
    });

    variants
        .iter()
        .enumerate()
        .map(|(index, v)| QualityLevel {
            index: index as i32,
            height: v.height,
            bitrate: v.bandwidth,
        })
        .collect()
}

/// Adaptive client backed by a fetched master manifest.
pub struct HlsManifestClient {
    http: reqwest::Client,
    manifest_url: Option<String>,
    /// Variants in ladder order (descending resolution).
    variants: Vec<VariantStream>,
    ladder: Vec<QualityLevel>,
    current: i32,
}

impl HlsManifestClient {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create manifest HTTP client")?;
        Ok(Self {
            http,
            manifest_url: None,
            variants: Vec::new(),
            ladder: Vec::new(),
            current: AUTO_LEVEL,
        })
    }

    /// Absolute URI of one ladder rung's variant playlist.
    pub fn variant_uri(&self, index: i32) -> Option<String> {
        let variant = self.variants.get(usize::try_from(index).ok()?)?;
        let base = self.manifest_url.as_deref()?;
        if variant.uri.starts_with("http://") || variant.uri.starts_with("https://") {
            return Some(variant.uri.clone());
        }
        let dir = base.rsplit_once('/').map(|(d, _)| d).unwrap_or(base);
        Some(format!("{}/{}", dir, variant.uri))
    }
}

#[async_trait]
impl AdaptiveClient for HlsManifestClient {
    async fn load(
        &mut self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Vec<QualityLevel>, PlaybackError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .context("Manifest request failed to send")
            .map_err(PlaybackError::ManifestLoad)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlaybackError::ManifestLoad(anyhow!(
                "Manifest request failed with status {}",
                status
            )));
        }

        let text = response
            .text()
            .await
            .context("Failed to read manifest body")
            .map_err(PlaybackError::ManifestLoad)?;

        let mut parsed = parse_master_playlist(&text).map_err(PlaybackError::ManifestLoad)?;
        if parsed.is_empty() {
            return Err(PlaybackError::ManifestLoad(anyhow!(
                "Manifest has no variant streams"
            )));
        }

        let ladder = build_ladder(&mut parsed);

        tracing::debug!(
            url = %url,
            rungs = ladder.len(),
            top = ladder.first().map(|l| l.height).unwrap_or(0),
            "Manifest parsed"
        );

        self.manifest_url = Some(url.to_string());
        self.variants = parsed;
        self.ladder = ladder.clone();
        self.current = AUTO_LEVEL;

        Ok(ladder)
    }

    fn set_level(&mut self, index: i32) -> Result<(), PlaybackError> {
        if index != AUTO_LEVEL && !(0..self.ladder.len() as i32).contains(&index) {
            return Err(PlaybackError::UnknownLevel(index));
        }
        self.current = index;
        Ok(())
    }

    fn current_level(&self) -> i32 {
        self.current
    }

    fn destroy(&mut self) {
        self.manifest_url = None;
        self.variants.clear();
        self.ladder.clear();
        self.current = AUTO_LEVEL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d401e,mp4a.40.2\"\n\
        360p/playlist.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080\n\
        1080p/playlist.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720\n\
        720p/playlist.m3u8\n";

    #[test]
    fn parses_variants_with_quoted_codecs() {
        let variants = parse_master_playlist(MASTER).unwrap();
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].height, 360);
        assert_eq!(variants[0].bandwidth, 800_000);
        assert_eq!(variants[0].uri, "360p/playlist.m3u8");
    }

    #[test]
    fn rejects_non_playlist_content() {
        assert!(parse_master_playlist("<html>nope</html>").is_err());
    }

    #[test]
    fn ladder_is_strictly_descending_by_height() {
        let mut variants = parse_master_playlist(MASTER).unwrap();
        let ladder = build_ladder(&mut variants);
        assert_eq!(
            ladder.iter().map(|l| l.height).collect::<Vec<_>>(),
            vec![1080, 720, 360]
        );
        assert_eq!(
            ladder.iter().map(|l| l.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn load_fetches_with_auth_header_and_builds_ladder() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vid-1/master.m3u8")
            .match_header("x-playback-auth", "token-1")
            .with_status(200)
            .with_body(MASTER)
            .create_async()
            .await;

        let mut client = HlsManifestClient::new().unwrap();
        let headers =
            HashMap::from([("X-Playback-Auth".to_string(), "token-1".to_string())]);
        let ladder = client
            .load(&format!("{}/vid-1/master.m3u8", server.url()), &headers)
            .await
            .unwrap();

        assert_eq!(ladder.len(), 3);
        assert_eq!(ladder[0].height, 1080);
        assert_eq!(client.current_level(), AUTO_LEVEL);
        assert_eq!(
            client.variant_uri(0).unwrap(),
            format!("{}/vid-1/1080p/playlist.m3u8", server.url())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn media_playlist_is_not_attachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/vid-1/360p/playlist.m3u8")
            .with_status(200)
            .with_body("#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n")
            .create_async()
            .await;

        let mut client = HlsManifestClient::new().unwrap();
        let err = client
            .load(
                &format!("{}/vid-1/360p/playlist.m3u8", server.url()),
                &HashMap::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::ManifestLoad(_)));
    }

    #[tokio::test]
    async fn set_level_validates_rung_bounds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/master.m3u8")
            .with_status(200)
            .with_body(MASTER)
            .create_async()
            .await;

        let mut client = HlsManifestClient::new().unwrap();
        client
            .load(&format!("{}/master.m3u8", server.url()), &HashMap::new())
            .await
            .unwrap();

        client.set_level(2).unwrap();
        assert_eq!(client.current_level(), 2);
        client.set_level(AUTO_LEVEL).unwrap();
        assert_eq!(client.current_level(), AUTO_LEVEL);
        assert!(matches!(
            client.set_level(3),
            Err(PlaybackError::UnknownLevel(3))
        ));
    }
}
