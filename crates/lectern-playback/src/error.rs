//! Playback error taxonomy.

use lectern_core::{LogLevel, UserFacing};
use thiserror::Error;

/// The backend refused to issue a playback credential.
///
/// Terminal for the current playback attempt; recovery is an explicit user
/// retry that re-resolves from scratch.
#[derive(Debug, Error)]
#[error("Playback authorization failed")]
pub struct ResolutionError(#[source] pub anyhow::Error);

impl UserFacing for ResolutionError {
    fn user_message(&self) -> String {
        "Could not authorize video playback. Try again.".to_string()
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Manifest could not be loaded")]
    ManifestLoad(#[source] anyhow::Error),

    #[error("Unrecognized video source: {0}")]
    UnrecognizedSource(String),

    #[error("No rung {0} in the quality ladder")]
    UnknownLevel(i32),

    #[error("Quality selection is not available for this source")]
    QualitySelectionUnavailable,
}

impl UserFacing for PlaybackError {
    fn user_message(&self) -> String {
        match self {
            PlaybackError::ManifestLoad(_) | PlaybackError::UnrecognizedSource(_) => {
                "Unable to play this video. The file may be unavailable, private, \
                 or in an unsupported format."
                    .to_string()
            }
            PlaybackError::UnknownLevel(_) | PlaybackError::QualitySelectionUnavailable => {
                "That quality level is not available.".to_string()
            }
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, PlaybackError::ManifestLoad(_))
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PlaybackError::UnknownLevel(_) | PlaybackError::QualitySelectionUnavailable => {
                LogLevel::Debug
            }
            _ => LogLevel::Warn,
        }
    }
}
