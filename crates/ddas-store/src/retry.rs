//! Retry with exponential backoff for artifact uploads.
//!
//! Only [`StoreError::Unavailable`] is retried. Rejections and every other
//! error class are returned on first sight. Each attempt calls `put` afresh,
//! so each attempt writes a new key.

use std::time::Duration;

use ddas_core::{ArtifactUri, OwnerId};

use crate::error::StoreError;
use crate::payload::ArtifactPayload;
use crate::ArchiveStore;

/// Total upload attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay after the first failure (doubles each attempt: 200ms, 400ms, ...).
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// Upper bound on a single backoff delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Upload `payload`, retrying transient failures per `policy`.
///
/// At most [`DEFAULT_MAX_ATTEMPTS`] attempts are made whatever the policy asks.
pub async fn put_with_retry(
    store: &dyn ArchiveStore,
    owner: &OwnerId,
    payload: &ArtifactPayload,
    policy: &RetryPolicy,
) -> Result<ArtifactUri, StoreError> {
    let max_attempts = policy.max_attempts.clamp(1, DEFAULT_MAX_ATTEMPTS);
    let mut attempt = 1;
    loop {
        match store.put(owner, payload).await {
            Ok(uri) => {
                record_attempt(store, "ok");
                return Ok(uri);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                record_attempt(store, "unavailable");
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    backend = store.backend_name(),
                    owner = %owner,
                    "artifact upload failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                record_attempt(
                    store,
                    if e.is_transient() { "unavailable" } else { "rejected" },
                );
                tracing::warn!(
                    attempt,
                    backend = store.backend_name(),
                    owner = %owner,
                    "artifact upload failed permanently: {e}"
                );
                return Err(e);
            }
        }
    }
}

fn record_attempt(store: &dyn ArchiveStore, result: &'static str) {
    metrics::counter!(
        "ddas_store_put_attempts_total",
        "backend" => store.backend_name(),
        "result" => result
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryArchiveStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` puts with the given error, then delegates.
    struct Flaky {
        inner: InMemoryArchiveStore,
        failures: u32,
        error: StoreError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ArchiveStore for Flaky {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }

        async fn put(
            &self,
            owner: &OwnerId,
            payload: &ArtifactPayload,
        ) -> Result<ArtifactUri, StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(self.error.clone());
            }
            self.inner.put(owner, payload).await
        }

        async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError> {
            self.inner.get(uri).await
        }

        async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError> {
            self.inner.list(owner).await
        }

        async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError> {
            self.inner.delete(uri).await
        }
    }

    fn flaky(failures: u32, error: StoreError) -> Flaky {
        Flaky {
            inner: InMemoryArchiveStore::default(),
            failures,
            error,
            calls: AtomicU32::new(0),
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    fn owner() -> OwnerId {
        OwnerId::new("u1").unwrap()
    }

    #[test]
    fn default_policy_doubles_from_200ms() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
        assert_eq!(policy.delay_after(30), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = flaky(2, StoreError::unavailable(crate::StoreOp::Put, "timeout"));
        let payload = ArtifactPayload::Bytes(b"x".to_vec());

        let uri = put_with_retry(&store, &owner(), &payload, &fast()).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.get(&uri).await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let store = flaky(10, StoreError::unavailable(crate::StoreOp::Put, "503"));
        let payload = ArtifactPayload::Bytes(b"x".to_vec());

        let err = put_with_retry(&store, &owner(), &payload, &fast()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.object_count(), 0);
    }

    #[tokio::test]
    async fn rejections_are_not_retried() {
        let store = flaky(10, StoreError::rejected("quota exceeded"));
        let payload = ArtifactPayload::Bytes(b"x".to_vec());

        let err = put_with_retry(&store, &owner(), &payload, &fast()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let store = flaky(0, StoreError::rejected("unused"));
        let policy = RetryPolicy {
            max_attempts: 0,
            ..fast()
        };
        let payload = ArtifactPayload::Bytes(b"x".to_vec());
        assert!(put_with_retry(&store, &owner(), &payload, &policy).await.is_ok());
    }

    #[tokio::test]
    async fn attempts_never_exceed_three() {
        let store = flaky(10, StoreError::unavailable(crate::StoreOp::Put, "503"));
        let policy = RetryPolicy {
            max_attempts: 5,
            ..fast()
        };
        let payload = ArtifactPayload::Bytes(b"x".to_vec());
        let err = put_with_retry(&store, &owner(), &payload, &policy).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }
}
