//! Playback-side models: signed credentials and the quality ladder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Ladder index meaning "let the adaptive client pick" — never a real rung.
pub const AUTO_LEVEL: i32 = -1;

/// Short-lived credential granting read access to one video's manifest.
///
/// Held in memory for the duration of a single playback session; a new lesson
/// or a playback attempt after expiry requires re-resolution. Nothing in the
/// pipeline mutates or refreshes one of these.
#[derive(Debug, Clone)]
pub struct SignedAccess {
    pub url: String,
    pub custom_headers: HashMap<String, String>,
    pub expires_in: Duration,
    issued_at: Instant,
}

impl SignedAccess {
    pub fn new(url: String, custom_headers: HashMap<String, String>, expires_in: Duration) -> Self {
        Self {
            url,
            custom_headers,
            expires_in,
            issued_at: Instant::now(),
        }
    }

    /// Whether the credential has outlived its issuance window.
    pub fn is_expired(&self) -> bool {
        self.issued_at.elapsed() >= self.expires_in
    }
}

/// One rung of an adaptive ladder, as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Ladder position; `AUTO_LEVEL` is reserved for automatic selection.
    pub index: i32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Peak bitrate in bits per second.
    pub bitrate: u64,
}

impl QualityLevel {
    /// Display label, e.g. "720p".
    pub fn label(&self) -> String {
        format!("{}p", self.height)
    }
}
