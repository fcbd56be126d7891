//! Pipeline configuration from environment variables.

use std::env;
use std::time::Duration;

const PART_SIZE_MIB: u64 = 5;
const MAX_VIDEO_DURATION_SECS: u64 = 6 * 60;
const POLL_INTERVAL_MS: u64 = 3000;
const PART_RETRY_MAX_ATTEMPTS: u32 = 3;
const PART_RETRY_BASE_DELAY_MS: u64 = 500;

/// Object stores reject multipart parts smaller than this (except the last).
const MIN_PART_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Configuration for the upload and playback pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Backend REST base URL, e.g. "https://api.example.com/api".
    pub api_base_url: String,
    /// Fixed size of each upload part in bytes.
    pub part_size_bytes: u64,
    /// Duration ceiling for uploaded videos.
    pub max_video_duration: Duration,
    /// Cadence of encode-status polling.
    pub poll_interval: Duration,
    /// Path to the ffprobe binary used for local metadata probing.
    pub ffprobe_path: String,
    /// Directory where resumable upload sessions are persisted.
    pub session_dir: String,
    /// Per-part retry budget (attempts including the first).
    pub part_retry_max_attempts: u32,
    /// Base delay for per-part exponential backoff.
    pub part_retry_base_delay: Duration,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("LECTERN_API_URL")
            .or_else(|_| env::var("API_URL"))
            .map_err(|_| anyhow::anyhow!("LECTERN_API_URL or API_URL must be set"))?;

        let part_size_bytes = env::var("LECTERN_PART_SIZE_MIB")
            .unwrap_or_else(|_| PART_SIZE_MIB.to_string())
            .parse::<u64>()
            .unwrap_or(PART_SIZE_MIB)
            * 1024
            * 1024;

        let max_duration_secs = env::var("LECTERN_MAX_VIDEO_DURATION_SECS")
            .unwrap_or_else(|_| MAX_VIDEO_DURATION_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_VIDEO_DURATION_SECS);

        let poll_interval_ms = env::var("LECTERN_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
            .parse::<u64>()
            .unwrap_or(POLL_INTERVAL_MS);

        let config = Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            part_size_bytes,
            max_video_duration: Duration::from_secs(max_duration_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            session_dir: env::var("LECTERN_SESSION_DIR")
                .unwrap_or_else(|_| ".lectern/sessions".to_string()),
            part_retry_max_attempts: env::var("LECTERN_PART_RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| PART_RETRY_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(PART_RETRY_MAX_ATTEMPTS),
            part_retry_base_delay: Duration::from_millis(
                env::var("LECTERN_PART_RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| PART_RETRY_BASE_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(PART_RETRY_BASE_DELAY_MS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_base_url.is_empty() {
            return Err(anyhow::anyhow!("API base URL must not be empty"));
        }
        if self.part_size_bytes < MIN_PART_SIZE_BYTES {
            return Err(anyhow::anyhow!(
                "Part size {} is below the {} byte multipart minimum",
                self.part_size_bytes,
                MIN_PART_SIZE_BYTES
            ));
        }
        if self.max_video_duration.is_zero() {
            return Err(anyhow::anyhow!("Video duration ceiling must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow::anyhow!("Poll interval must be non-zero"));
        }
        if self.part_retry_max_attempts == 0 {
            return Err(anyhow::anyhow!("Part retry budget must allow one attempt"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            part_size_bytes: PART_SIZE_MIB * 1024 * 1024,
            max_video_duration: Duration::from_secs(MAX_VIDEO_DURATION_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            ffprobe_path: "ffprobe".to_string(),
            session_dir: ".lectern/sessions".to_string(),
            part_retry_max_attempts: PART_RETRY_MAX_ATTEMPTS,
            part_retry_base_delay: Duration::from_millis(PART_RETRY_BASE_DELAY_MS),
        }
    }
}
