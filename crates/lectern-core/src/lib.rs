//! Core types for the lectern video pipeline.
//!
//! Shared models (upload sessions, lesson video references, signed playback
//! credentials, quality ladders), the error-reporting traits, and environment
//! configuration. Domain crates (upload, playback) build on these.

pub mod config;
pub mod error;
pub mod models;

pub use config::PipelineConfig;
pub use error::{LogLevel, UserFacing};
pub use models::{
    CompletedPart, FileFingerprint, LessonVideoRef, QualityLevel, SignedAccess, UploadSession,
    VideoStatus, AUTO_LEVEL,
};
