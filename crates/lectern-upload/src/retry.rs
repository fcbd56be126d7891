//! Bounded per-part retry, kept out of the coordinator's sequencing logic.

use async_trait::async_trait;
use bytes::Bytes;
use lectern_core::models::CompletedPart;
use std::sync::Arc;
use std::time::Duration;

use crate::error::UploadError;
use crate::traits::PartSink;

/// Retry budget for one part: `max_attempts` includes the first try, and the
/// delay doubles per failed attempt starting from `base_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn delay_for(&self, failed_attempts: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(failed_attempts.saturating_sub(1))
    }
}

/// Decorator that retries a wrapped [`PartSink`] on transient failure.
///
/// Each attempt goes through the inner sink from the top, so the presigned
/// URL is re-requested every time - the credential is single-use and must
/// never be replayed. Only terminal failure (budget exhausted) surfaces.
pub struct RetryingSink {
    inner: Arc<dyn PartSink>,
    policy: RetryPolicy,
}

impl RetryingSink {
    pub fn new(inner: Arc<dyn PartSink>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl PartSink for RetryingSink {
    async fn upload_part(
        &self,
        video_id: &str,
        part_number: u32,
        content_type: &str,
        body: Bytes,
    ) -> Result<CompletedPart, UploadError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .inner
                .upload_part(video_id, part_number, content_type, body.clone())
                .await
            {
                Ok(part) => return Ok(part),
                Err(err) if attempt < self.policy.max_attempts && err.is_transient() => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        video_id = %video_id,
                        part_number = part_number,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Part transfer failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl UploadError {
    /// Whether a fresh attempt at the same part can succeed.
    fn is_transient(&self) -> bool {
        matches!(self, UploadError::Transfer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySink {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl PartSink for FlakySink {
        async fn upload_part(
            &self,
            _video_id: &str,
            part_number: u32,
            _content_type: &str,
            _body: Bytes,
        ) -> Result<CompletedPart, UploadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(UploadError::Transfer {
                    part_number,
                    source: anyhow::anyhow!("connection reset"),
                })
            } else {
                Ok(CompletedPart {
                    part_number,
                    etag: "\"ok\"".to_string(),
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_within_budget() {
        let inner = Arc::new(FlakySink {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let sink = RetryingSink::new(
            inner.clone(),
            RetryPolicy::new(3, Duration::from_millis(100)),
        );

        let part = sink
            .upload_part("vid-1", 1, "video/mp4", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(part.part_number, 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_terminal_failure_after_budget_exhausted() {
        let inner = Arc::new(FlakySink {
            calls: AtomicU32::new(0),
            fail_first: 10,
        });
        let sink = RetryingSink::new(
            inner.clone(),
            RetryPolicy::new(3, Duration::from_millis(100)),
        );

        let err = sink
            .upload_part("vid-1", 2, "video/mp4", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transfer { part_number: 2, .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_style_errors_are_not_retried() {
        struct RejectingSink;

        #[async_trait]
        impl PartSink for RejectingSink {
            async fn upload_part(
                &self,
                _video_id: &str,
                _part_number: u32,
                _content_type: &str,
                _body: Bytes,
            ) -> Result<CompletedPart, UploadError> {
                Err(UploadError::Validation("bad input".to_string()))
            }
        }

        let sink = RetryingSink::new(
            Arc::new(RejectingSink),
            RetryPolicy::new(5, Duration::from_millis(100)),
        );
        let err = sink
            .upload_part("vid-1", 1, "video/mp4", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }

    #[test]
    fn backoff_doubles_per_failed_attempt() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }
}
