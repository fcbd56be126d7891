//! Multipart upload session state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Receipt for one transmitted part. Serialized field names match the
/// finalize payload the backend forwards to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// Violation of the part-sequencing invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartSequenceError {
    #[error("part {got} recorded out of order, expected part {expected}")]
    OutOfOrder { expected: u32, got: u32 },
    #[error("part {0} exceeds declared total of {1} parts")]
    BeyondTotal(u32, u32),
}

/// One in-progress multipart upload.
///
/// `parts` is append-only: receipts are recorded in strictly increasing
/// part-number order with no gaps, and the session is only finalizable once
/// every declared part has a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub video_id: String,
    pub upload_id: String,
    pub object_key: String,
    pub part_size: u64,
    pub total_parts: u32,
    pub parts: Vec<CompletedPart>,
}

impl UploadSession {
    pub fn new(
        video_id: String,
        upload_id: String,
        object_key: String,
        part_size: u64,
        file_size: u64,
    ) -> Self {
        Self {
            video_id,
            upload_id,
            object_key,
            part_size,
            total_parts: total_parts_for(file_size, part_size),
            parts: Vec::new(),
        }
    }

    /// Part number the next receipt must carry (1-based).
    pub fn next_part_number(&self) -> u32 {
        self.parts.len() as u32 + 1
    }

    /// Record the receipt for one transmitted part.
    pub fn record_part(&mut self, part: CompletedPart) -> Result<(), PartSequenceError> {
        let expected = self.next_part_number();
        if part.part_number != expected {
            return Err(PartSequenceError::OutOfOrder {
                expected,
                got: part.part_number,
            });
        }
        if part.part_number > self.total_parts {
            return Err(PartSequenceError::BeyondTotal(
                part.part_number,
                self.total_parts,
            ));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Whether every declared part has a recorded receipt.
    pub fn is_complete(&self) -> bool {
        self.parts.len() as u32 == self.total_parts
    }

    /// Upload progress in [0, 100], computed from recorded receipts only.
    pub fn progress_percent(&self) -> u8 {
        if self.total_parts == 0 {
            return 0;
        }
        let pct = (self.parts.len() as f64 / self.total_parts as f64) * 100.0;
        pct.round() as u8
    }

    /// Byte range of the given 1-based part within a file of `file_size`.
    pub fn part_range(&self, part_number: u32, file_size: u64) -> (u64, u64) {
        let start = (part_number as u64 - 1) * self.part_size;
        let end = (start + self.part_size).min(file_size);
        (start, end)
    }
}

/// Number of fixed-size parts needed to cover `file_size` bytes.
pub fn total_parts_for(file_size: u64, part_size: u64) -> u32 {
    if file_size == 0 {
        return 0;
    }
    file_size.div_ceil(part_size) as u32
}

/// Stable identity of a local file, used to key persisted upload sessions
/// across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub name: String,
    pub size: u64,
    pub modified_unix_ms: u64,
}

impl FileFingerprint {
    /// Filesystem-safe key for this fingerprint.
    pub fn key(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}-{}-{}", name, self.size, self.modified_unix_ms)
    }
}
