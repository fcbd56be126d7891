//! Adaptive playback: signed-URL resolution, source classification, and
//! attachment of a manifest to a media surface.
//!
//! The [`resolver::SignedPlaybackResolver`] turns an opaque video id into a
//! time-boxed [`lectern_core::models::SignedAccess`]. The
//! [`engine::PlaybackEngine`] classifies the lesson's source, picks the best
//! available decoder through a ranked capability-probe list, and exposes the
//! discovered quality ladder with a manual override.

pub mod engine;
pub mod error;
pub mod hls;
pub mod resolver;
pub mod source;

pub use engine::{AdaptiveClient, MediaSurface, PlaybackEngine, PlaybackState};
pub use error::{PlaybackError, ResolutionError};
pub use resolver::SignedPlaybackResolver;
pub use source::PlaybackSource;
