//! Best-effort mirror between the local store and the remote progress service.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pathway_core::model::{LevelSlug, ProgressKey, ProgressRecord, TrackSlug};
use tokio::sync::OnceCell;

use crate::cancel::CancelToken;
use crate::error::RemoteError;
use crate::remote::{ProgressRemote, RemoteProgress, call_bounded, log_remote_failure};

type Listing = Option<Arc<Vec<RemoteProgress>>>;

/// Result of looking up one level on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    Record(ProgressRecord),
    /// The remote answered and has nothing for this level.
    NotFound,
    /// Timed out, failed, disabled or cancelled.
    Unavailable,
}

impl Pulled {
    #[must_use]
    pub fn into_record(self) -> Option<ProgressRecord> {
        match self {
            Pulled::Record(record) => Some(record),
            Pulled::NotFound | Pulled::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    pub synced: bool,
}

/// Whether a local change reached the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    /// The push failed or the remote is not configured; the local record
    /// stays authoritative until the next successful sync.
    LocalOnly,
    /// The caller was torn down before the push started.
    Skipped,
}

impl From<PushOutcome> for SyncStatus {
    fn from(outcome: PushOutcome) -> Self {
        if outcome.synced {
            SyncStatus::Synced
        } else {
            SyncStatus::LocalOnly
        }
    }
}

/// Bounded, coalescing access to a [`ProgressRemote`].
///
/// No method returns an error. Failures are logged and reported as absent
/// or unsynced so the caller can carry on with local data.
pub struct SyncBridge {
    remote: Arc<dyn ProgressRemote>,
    timeout: Duration,
    inflight: Mutex<Option<Arc<OnceCell<Listing>>>>,
}

impl SyncBridge {
    #[must_use]
    pub fn new(remote: Arc<dyn ProgressRemote>, timeout: Duration) -> Self {
        Self {
            remote,
            timeout,
            inflight: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Remote record for one level, or `None` when absent or unreachable.
    pub async fn pull(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        cancel: &CancelToken,
    ) -> Option<ProgressRecord> {
        self.fetch(track, level, cancel).await.into_record()
    }

    pub async fn fetch(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        cancel: &CancelToken,
    ) -> Pulled {
        let Some(listing) = self.pull_all(cancel).await else {
            return Pulled::Unavailable;
        };
        listing
            .iter()
            .find(|entry| &entry.key.track == track && &entry.key.level == level)
            .map_or(Pulled::NotFound, |entry| Pulled::Record(entry.record.clone()))
    }

    /// Every remote record of the current user.
    ///
    /// Callers that arrive while a list request is in flight wait for that
    /// request instead of starting another. Cancelling one caller does not
    /// abandon the request for the others.
    pub async fn pull_all(&self, cancel: &CancelToken) -> Listing {
        if cancel.is_cancelled() {
            return None;
        }
        let cell = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.get_or_insert_with(|| Arc::new(OnceCell::new())))
        };

        let listing = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log_remote_failure("list_progress", &RemoteError::Cancelled);
                return None;
            }
            listing = cell.get_or_init(|| self.list_once()) => listing.clone(),
        };

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight.as_ref().is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            *inflight = None;
        }
        listing
    }

    async fn list_once(&self) -> Listing {
        // shared between callers, so only the timeout bounds it
        let detached = CancelToken::new();
        match call_bounded(self.timeout, &detached, self.remote.list_progress()).await {
            Ok(listed) => {
                tracing::debug!(records = listed.len(), "pulled remote progress");
                Some(Arc::new(listed))
            }
            Err(err) => {
                log_remote_failure("list_progress", &err);
                None
            }
        }
    }

    pub async fn push(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        record: &ProgressRecord,
        cancel: &CancelToken,
    ) -> PushOutcome {
        let key = ProgressKey::new(track.clone(), level.clone());
        match call_bounded(self.timeout, cancel, self.remote.upsert_progress(&key, record)).await {
            Ok(()) => {
                tracing::debug!(key = %key, "pushed progress");
                PushOutcome { synced: true }
            }
            Err(err) => {
                log_remote_failure("upsert_progress", &err);
                PushOutcome { synced: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::OfflineRemote;
    use async_trait::async_trait;
    use pathway_core::time::fixed_now;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowRemote {
        delay: Duration,
        lists: AtomicUsize,
        listing: Vec<RemoteProgress>,
    }

    impl SlowRemote {
        fn new(delay: Duration, listing: Vec<RemoteProgress>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                lists: AtomicUsize::new(0),
                listing,
            })
        }
    }

    #[async_trait]
    impl ProgressRemote for SlowRemote {
        async fn list_progress(&self) -> Result<Vec<RemoteProgress>, RemoteError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.listing.clone())
        }

        async fn upsert_progress(
            &self,
            _key: &ProgressKey,
            _record: &ProgressRecord,
        ) -> Result<(), RemoteError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    fn css_beginner() -> (TrackSlug, LevelSlug) {
        (TrackSlug::new("css").unwrap(), LevelSlug::new("beginner").unwrap())
    }

    fn listing() -> Vec<RemoteProgress> {
        let (track, level) = css_beginner();
        vec![RemoteProgress {
            key: ProgressKey::new(track, level),
            record: ProgressRecord::new(3, fixed_now()),
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pulls_share_one_list_request() {
        let remote = SlowRemote::new(Duration::from_millis(200), listing());
        let bridge = SyncBridge::new(remote.clone(), Duration::from_secs(5));
        let cancel = CancelToken::new();
        let (track, level) = css_beginner();
        let advanced = LevelSlug::new("advanced").unwrap();

        let (a, b, c) = tokio::join!(
            bridge.pull(&track, &level, &cancel),
            bridge.pull(&track, &level, &cancel),
            bridge.fetch(&track, &advanced, &cancel),
        );

        assert_eq!(remote.lists.load(Ordering::SeqCst), 1);
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(c, Pulled::NotFound);

        // a later pull starts a fresh request
        bridge.pull(&track, &level, &cancel).await;
        assert_eq!(remote.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_remote_times_out_as_absent() {
        let remote = SlowRemote::new(Duration::from_secs(10), listing());
        let bridge = SyncBridge::new(remote, Duration::from_millis(100));
        let (track, level) = css_beginner();

        let pulled = bridge.fetch(&track, &level, &CancelToken::new()).await;
        assert_eq!(pulled, Pulled::Unavailable);

        let pushed = bridge
            .push(&track, &level, &ProgressRecord::new(3, fixed_now()), &CancelToken::new())
            .await;
        assert!(!pushed.synced);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_pull_is_abandoned() {
        let remote = SlowRemote::new(Duration::from_secs(1), listing());
        let bridge = SyncBridge::new(remote.clone(), Duration::from_secs(5));
        let cancel = CancelToken::new();
        let (track, level) = css_beginner();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert_eq!(bridge.pull(&track, &level, &cancel).await, None);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn offline_remote_is_unavailable_not_missing() {
        let bridge = SyncBridge::new(Arc::new(OfflineRemote), Duration::from_secs(1));
        let (track, level) = css_beginner();
        let cancel = CancelToken::new();

        assert_eq!(bridge.fetch(&track, &level, &cancel).await, Pulled::Unavailable);
        let pushed = bridge
            .push(&track, &level, &ProgressRecord::new(1, fixed_now()), &cancel)
            .await;
        assert_eq!(pushed, PushOutcome { synced: false });
    }
}
