//! Durable upload sessions for resume-after-restart.
//!
//! The coordinator keeps its session in memory; an interrupted process loses
//! nothing the backend already holds, but the client forgets where it was.
//! Persisting a snapshot keyed by a stable file fingerprint lets an explicit
//! resume path pick up from the first missing part after reconciling with
//! the backend.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lectern_core::models::{FileFingerprint, UploadSession};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Snapshot of one interrupted upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub fingerprint: FileFingerprint,
    pub session: UploadSession,
    pub content_type: String,
    pub saved_at: DateTime<Utc>,
}

/// Durable storage for upload snapshots.
pub trait SessionStore: Send + Sync {
    fn load(&self, fingerprint: &FileFingerprint) -> Result<Option<PersistedSession>>;
    fn save(&self, snapshot: &PersistedSession) -> Result<()>;
    fn remove(&self, fingerprint: &FileFingerprint) -> Result<()>;
}

/// Fingerprint a local file by name, size, and mtime.
pub fn fingerprint_of(path: &Path) -> Result<FileFingerprint> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let modified_unix_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Ok(FileFingerprint {
        name: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string(),
        size: metadata.len(),
        modified_unix_ms,
    })
}

/// One JSON file per fingerprint under a session directory.
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, fingerprint: &FileFingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.key()))
    }
}

impl SessionStore for JsonFileSessionStore {
    fn load(&self, fingerprint: &FileFingerprint) -> Result<Option<PersistedSession>> {
        let path = self.path_for(fingerprint);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let snapshot: PersistedSession = serde_json::from_slice(&data)
            .with_context(|| format!("Corrupt session snapshot {}", path.display()))?;

        // A snapshot for a file that changed since is worthless; treat it as
        // absent rather than resuming into the wrong bytes.
        if &snapshot.fingerprint != fingerprint {
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &PersistedSession) -> Result<()> {
        let path = self.path_for(&snapshot.fingerprint);
        let data = serde_json::to_vec_pretty(snapshot).context("Serialize session snapshot")?;

        // Write-then-rename so a crash mid-save can't leave a torn snapshot.
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temp snapshot file")?;
        temp.write_all(&data).context("Failed to write snapshot")?;
        temp.persist(&path)
            .with_context(|| format!("Failed to persist snapshot {}", path.display()))?;

        Ok(())
    }

    fn remove(&self, fingerprint: &FileFingerprint) -> Result<()> {
        let path = self.path_for(fingerprint);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(fingerprint: FileFingerprint) -> PersistedSession {
        let mut session = UploadSession::new(
            "vid-1".to_string(),
            "up-1".to_string(),
            "media/vid-1.mp4".to_string(),
            5 * 1024 * 1024,
            12 * 1024 * 1024,
        );
        session
            .record_part(lectern_core::models::CompletedPart {
                part_number: 1,
                etag: "\"a\"".to_string(),
            })
            .unwrap();
        PersistedSession {
            fingerprint,
            session,
            content_type: "video/mp4".to_string(),
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn save_load_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();
        let fp = FileFingerprint {
            name: "lecture.mp4".to_string(),
            size: 12 * 1024 * 1024,
            modified_unix_ms: 1_700_000_000_000,
        };

        assert!(store.load(&fp).unwrap().is_none());

        store.save(&snapshot(fp.clone())).unwrap();
        let loaded = store.load(&fp).unwrap().unwrap();
        assert_eq!(loaded.session.video_id, "vid-1");
        assert_eq!(loaded.session.parts.len(), 1);

        store.remove(&fp).unwrap();
        assert!(store.load(&fp).unwrap().is_none());
    }

    #[test]
    fn changed_file_invalidates_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();
        let fp = FileFingerprint {
            name: "lecture.mp4".to_string(),
            size: 100,
            modified_unix_ms: 1,
        };
        store.save(&snapshot(fp.clone())).unwrap();

        // Same name and size, later mtime: different file contents possible.
        let altered = FileFingerprint {
            modified_unix_ms: 2,
            ..fp
        };
        assert!(store.load(&altered).unwrap().is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();
        let fp = FileFingerprint {
            name: "gone.mp4".to_string(),
            size: 1,
            modified_unix_ms: 1,
        };
        store.remove(&fp).unwrap();
    }
}
