//! Local media probing - duration and MIME type, before any network call.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// What the probe learned about a local file.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration: Duration,
    pub mime_type: String,
    pub file_size: u64,
}

/// Reads media metadata from a local file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// MIME type inferred from the file extension, the same signal a browser's
/// file input reports. Unknown extensions map to application/octet-stream so
/// validation can reject them.
pub fn mime_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogg" | "ogv" => "video/ogg",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// The ffprobe path comes from configuration; refuse anything that smells
/// like shell metacharacters before handing it to a subprocess.
fn validate_binary_path(path: &str) -> Result<()> {
    const FORBIDDEN: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(anyhow!("Probe binary path contains forbidden characters: {}", path));
    }
    Ok(())
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probes duration with ffprobe.
pub struct FfprobeInspector {
    ffprobe_path: String,
}

impl FfprobeInspector {
    pub fn new(ffprobe_path: String) -> Result<Self> {
        validate_binary_path(&ffprobe_path).context("Invalid ffprobe path")?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("ffprobe failed: {}", stderr.trim()));
        }

        let parsed: FfprobeOutput =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        let seconds = parsed
            .format
            .duration
            .as_deref()
            .map(str::parse::<f64>)
            .transpose()
            .context("ffprobe reported a non-numeric duration")?
            .unwrap_or(0.0);

        Ok(MediaInfo {
            duration: Duration::from_secs_f64(seconds.max(0.0)),
            mime_type: mime_for_path(path),
            file_size: metadata.len(),
        })
    }
}
