//! Video ingestion: chunked multipart upload and encode-status watching.
//!
//! The [`coordinator::UploadCoordinator`] splits a local video file into
//! fixed-size parts, transmits each part directly to object storage via a
//! part-scoped presigned URL, and finalizes the upload through the backend.
//! The [`watcher::EncodeWatcher`] then polls transcode status and attaches
//! the resulting manifest URL to the owning lesson.

pub mod coordinator;
pub mod error;
pub mod probe;
pub mod resume;
pub mod retry;
pub mod traits;
pub mod transport;
pub mod watcher;

pub use coordinator::{UploadCoordinator, Validation};
pub use error::{UploadError, UploadStage};
pub use retry::RetryPolicy;
pub use watcher::{EncodeState, EncodeTicket, EncodeWatcher};
