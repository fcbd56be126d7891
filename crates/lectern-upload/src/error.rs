//! Upload error taxonomy.
//!
//! Every failure is tagged with the stage it happened in so callers can show
//! stage-specific messaging. Validation rejections carry the user-facing
//! reason directly.

use lectern_core::models::upload::PartSequenceError;
use lectern_core::{LogLevel, UserFacing};
use thiserror::Error;

/// Which stage of an upload attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Initiate,
    Transfer,
    Finalize,
}

impl std::fmt::Display for UploadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStage::Initiate => write!(f, "initiate"),
            UploadStage::Transfer => write!(f, "upload"),
            UploadStage::Finalize => write!(f, "finalize"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    /// Pre-network rejection; the message is safe to show inline.
    #[error("{0}")]
    Validation(String),

    #[error("Upload initiation failed")]
    Initiate(#[source] anyhow::Error),

    #[error("Part {part_number} failed to transfer")]
    Transfer {
        part_number: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Upload finalization failed")]
    Finalize(#[source] anyhow::Error),

    #[error("Part sequencing violated")]
    Sequence(#[from] PartSequenceError),

    #[error("Failed to read source file")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Stage of the attempt this error aborted, if it got past validation.
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            UploadError::Validation(_) => None,
            UploadError::Initiate(_) => Some(UploadStage::Initiate),
            UploadError::Transfer { .. }
            | UploadError::Sequence(_)
            | UploadError::Io(_) => Some(UploadStage::Transfer),
            UploadError::Finalize(_) => Some(UploadStage::Finalize),
        }
    }
}

impl UserFacing for UploadError {
    fn user_message(&self) -> String {
        match self {
            UploadError::Validation(reason) => reason.clone(),
            UploadError::Initiate(_) => "Could not start the upload. Try again.".to_string(),
            UploadError::Transfer { .. } | UploadError::Sequence(_) => {
                "Upload failed partway through. Try again.".to_string()
            }
            UploadError::Finalize(_) => {
                "Upload could not be finalized. Try again.".to_string()
            }
            UploadError::Io(_) => "Could not read the selected file.".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, UploadError::Validation(_))
    }

    fn log_level(&self) -> LogLevel {
        match self {
            UploadError::Validation(_) => LogLevel::Debug,
            UploadError::Transfer { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tagging() {
        assert_eq!(UploadError::Validation("too long".into()).stage(), None);
        assert_eq!(
            UploadError::Initiate(anyhow::anyhow!("boom")).stage(),
            Some(UploadStage::Initiate)
        );
        assert_eq!(
            UploadError::Transfer {
                part_number: 2,
                source: anyhow::anyhow!("boom"),
            }
            .stage(),
            Some(UploadStage::Transfer)
        );
        assert_eq!(
            UploadError::Finalize(anyhow::anyhow!("boom")).stage(),
            Some(UploadStage::Finalize)
        );
    }

    #[test]
    fn validation_message_passes_through() {
        let err = UploadError::Validation("Video is 601s long. Maximum is 360s.".to_string());
        assert_eq!(err.user_message(), "Video is 601s long. Maximum is 360s.");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }
}
