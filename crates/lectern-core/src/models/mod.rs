pub mod playback;
pub mod upload;
pub mod video;

pub use playback::{QualityLevel, SignedAccess, AUTO_LEVEL};
pub use upload::{CompletedPart, FileFingerprint, UploadSession};
pub use video::{LessonVideoRef, VideoStatus};
