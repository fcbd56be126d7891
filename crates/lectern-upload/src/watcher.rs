//! Encode-status watcher: single-flight polling registry.
//!
//! After finalize, a video sits in `processing` until the transcoding worker
//! publishes its manifest. The watcher owns one poll per video id, updates
//! the lesson model when the video turns ready, and is torn down with the
//! editor session that created it, so no timer outlives its owner.

use anyhow::anyhow;
use lectern_core::models::VideoStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::traits::{LessonStore, StatusApi};

/// What the editor UI shows for an in-flight encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeState {
    Processing,
    Ready(String),
    Failed,
}

/// Handle to one video's encode signal.
///
/// Dropping the ticket dismisses the UI signal without cancelling the
/// underlying poll; the lesson model is still updated silently when the
/// video turns ready. Use [`EncodeWatcher::cancel`] to stop both.
#[derive(Debug, Clone)]
pub struct EncodeTicket {
    pub video_id: String,
    state: watch::Receiver<EncodeState>,
}

impl EncodeTicket {
    pub fn current(&self) -> EncodeState {
        self.state.borrow().clone()
    }

    /// Wait until the encode reaches a terminal state.
    pub async fn terminal(&mut self) -> EncodeState {
        loop {
            let state = self.state.borrow().clone();
            if !matches!(state, EncodeState::Processing) {
                return state;
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }
}

struct ActivePoll {
    generation: u64,
    cancel: CancellationToken,
    state: watch::Receiver<EncodeState>,
}

/// Registry of active encode polls, owned by the editor session.
pub struct EncodeWatcher {
    api: Arc<dyn StatusApi>,
    lessons: Arc<dyn LessonStore>,
    poll_interval: Duration,
    active: Arc<Mutex<HashMap<String, ActivePoll>>>,
    generation: Mutex<u64>,
}

impl EncodeWatcher {
    pub fn new(api: Arc<dyn StatusApi>, lessons: Arc<dyn LessonStore>, poll_interval: Duration) -> Self {
        Self {
            api,
            lessons,
            poll_interval,
            active: Arc::new(Mutex::new(HashMap::new())),
            generation: Mutex::new(0),
        }
    }

    /// Start polling one video. Starting a poll for an id already being
    /// polled is a no-op: the returned ticket subscribes to the existing
    /// poll's signal and no second timer is created.
    pub fn watch(&self, video_id: &str, lesson_id: Uuid) -> EncodeTicket {
        let mut active = self.active.lock().expect("poll registry poisoned");

        if let Some(existing) = active.get(video_id) {
            tracing::debug!(video_id = %video_id, "Poll already active, joining");
            return EncodeTicket {
                video_id: video_id.to_string(),
                state: existing.state.clone(),
            };
        }

        let generation = {
            let mut g = self.generation.lock().expect("generation counter poisoned");
            *g += 1;
            *g
        };

        let (tx, rx) = watch::channel(EncodeState::Processing);
        let cancel = CancellationToken::new();

        active.insert(
            video_id.to_string(),
            ActivePoll {
                generation,
                cancel: cancel.clone(),
                state: rx.clone(),
            },
        );
        drop(active);

        tracing::info!(video_id = %video_id, lesson_id = %lesson_id, "Encode poll started");

        tokio::spawn(poll_until_terminal(
            self.api.clone(),
            self.lessons.clone(),
            self.active.clone(),
            self.poll_interval,
            video_id.to_string(),
            lesson_id,
            generation,
            cancel,
            tx,
        ));

        EncodeTicket {
            video_id: video_id.to_string(),
            state: rx,
        }
    }

    /// Stop the poll for one video id, if any. The lesson model keeps
    /// whatever state the poll last wrote.
    pub fn cancel(&self, video_id: &str) {
        let mut active = self.active.lock().expect("poll registry poisoned");
        if let Some(poll) = active.remove(video_id) {
            poll.cancel.cancel();
            tracing::info!(video_id = %video_id, "Encode poll cancelled");
        }
    }

    /// Tear down every poll this watcher owns.
    pub fn shutdown(&self) {
        let mut active = self.active.lock().expect("poll registry poisoned");
        for (video_id, poll) in active.drain() {
            poll.cancel.cancel();
            tracing::debug!(video_id = %video_id, "Encode poll torn down");
        }
    }

    /// Bounded wait used before publishing: polls until the video is ready
    /// or the timeout elapses. `None` means "still processing" and is
    /// distinct from failure; callers proceed without blocking on it.
    pub async fn wait_for_ready(
        &self,
        video_id: &str,
        timeout: Duration,
    ) -> anyhow::Result<Option<String>> {
        let poll = async {
            loop {
                match self.api.video_status(video_id).await {
                    Ok((VideoStatus::Ready, Some(url))) => return Ok(Some(url)),
                    Ok((VideoStatus::Ready, None)) => {
                        return Err(anyhow!("Video {} ready without a manifest URL", video_id))
                    }
                    Ok((VideoStatus::Failed, _)) => {
                        return Err(anyhow!("Video {} failed transcoding", video_id))
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(video_id = %video_id, error = %e, "Status check failed")
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }
}

impl Drop for EncodeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_until_terminal(
    api: Arc<dyn StatusApi>,
    lessons: Arc<dyn LessonStore>,
    active: Arc<Mutex<HashMap<String, ActivePoll>>>,
    poll_interval: Duration,
    video_id: String,
    lesson_id: Uuid,
    generation: u64,
    cancel: CancellationToken,
    tx: watch::Sender<EncodeState>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match api.video_status(&video_id).await {
                    Ok((VideoStatus::Ready, Some(url))) => {
                        lessons.apply_ready(lesson_id, &video_id, &url);
                        let _ = tx.send(EncodeState::Ready(url));
                        tracing::info!(video_id = %video_id, lesson_id = %lesson_id, "Video ready");
                        break;
                    }
                    Ok((VideoStatus::Ready, None)) => {
                        tracing::error!(video_id = %video_id, "Ready status carried no manifest URL");
                        lessons.apply_failed(lesson_id, &video_id);
                        let _ = tx.send(EncodeState::Failed);
                        break;
                    }
                    Ok((VideoStatus::Failed, _)) => {
                        lessons.apply_failed(lesson_id, &video_id);
                        let _ = tx.send(EncodeState::Failed);
                        tracing::warn!(video_id = %video_id, "Video transcoding failed");
                        break;
                    }
                    Ok(_) => {}
                    // Transient transport errors keep the poll alive.
                    Err(e) => {
                        tracing::warn!(video_id = %video_id, error = %e, "Status poll failed")
                    }
                }
            }
        }
    }

    // Deregister, unless a newer poll already took the slot.
    let mut map = active.lock().expect("poll registry poisoned");
    if map.get(&video_id).is_some_and(|p| p.generation == generation) {
        map.remove(&video_id);
    }
}

/// Lesson model held in memory; the watcher writes only the video-reference
/// fields of an entry, never the rest of the lesson.
pub struct InMemoryLessonStore {
    lessons: std::sync::RwLock<HashMap<Uuid, lectern_core::models::LessonVideoRef>>,
}

impl InMemoryLessonStore {
    pub fn new() -> Self {
        Self {
            lessons: std::sync::RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, lesson_id: Uuid, video_ref: lectern_core::models::LessonVideoRef) {
        self.lessons
            .write()
            .expect("lesson store poisoned")
            .insert(lesson_id, video_ref);
    }

    pub fn get(&self, lesson_id: Uuid) -> Option<lectern_core::models::LessonVideoRef> {
        self.lessons
            .read()
            .expect("lesson store poisoned")
            .get(&lesson_id)
            .cloned()
    }
}

impl Default for InMemoryLessonStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonStore for InMemoryLessonStore {
    fn apply_ready(&self, lesson_id: Uuid, video_id: &str, manifest_url: &str) {
        let mut lessons = self.lessons.write().expect("lesson store poisoned");
        match lessons.get_mut(&lesson_id) {
            Some(video_ref) if video_ref.video_id.as_deref() == Some(video_id) => {
                video_ref.mark_ready(manifest_url.to_string());
            }
            Some(_) => {
                tracing::warn!(
                    lesson_id = %lesson_id,
                    video_id = %video_id,
                    "Lesson no longer references this video, skipping update"
                );
            }
            None => {
                tracing::warn!(lesson_id = %lesson_id, "Lesson missing from store, skipping update");
            }
        }
    }

    fn apply_failed(&self, lesson_id: Uuid, video_id: &str) {
        let mut lessons = self.lessons.write().expect("lesson store poisoned");
        if let Some(video_ref) = lessons.get_mut(&lesson_id) {
            if video_ref.video_id.as_deref() == Some(video_id) {
                video_ref.mark_failed();
            }
        }
    }
}
