#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pathway_core::model::{
    Catalog, Challenge, ChallengeId, Comment, CommentScope, Level, LevelSlug, ProgressKey,
    ProgressRecord, Track, TrackSlug,
};
use pathway_core::time::fixed_clock;
use services::{
    Clock, CommentRemote, PathwayServices, ProgressRemote, RemoteError, RemoteProgress, Remotes,
    SyncSettings,
};
use storage::{InMemoryKv, KeyValueStore, Storage, StorageError};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn track(slug: &str) -> TrackSlug {
    TrackSlug::new(slug).unwrap()
}

pub fn level(slug: &str) -> LevelSlug {
    LevelSlug::new(slug).unwrap()
}

pub fn key(t: &str, l: &str) -> ProgressKey {
    ProgressKey::new(track(t), level(l))
}

/// The solution of challenge `i` in every test level.
pub fn solution(i: usize) -> String {
    format!("answer-{i}")
}

/// Build a catalog from `(track, [(level, challenge count)])`.
pub fn catalog(tracks: &[(&str, &[(&str, usize)])]) -> Arc<Catalog> {
    let tracks = tracks
        .iter()
        .map(|(t, levels)| {
            let levels = levels
                .iter()
                .map(|(l, count)| {
                    let challenges = (0..*count)
                        .map(|i| {
                            Challenge::new(
                                ChallengeId::new(format!("{l}-{i}")).unwrap(),
                                format!("prompt {i}"),
                                solution(i),
                                None,
                            )
                        })
                        .collect();
                    Level::new(level(l), l.to_uppercase(), challenges, vec![])
                })
                .collect();
            Track::new(track(t), t.to_uppercase(), levels)
        })
        .collect();
    Arc::new(Catalog::new(tracks).unwrap())
}

pub fn java_dsa() -> Arc<Catalog> {
    catalog(&[("java-dsa", &[("beginner", 5), ("intermediate", 4)])])
}

pub fn services_with(
    storage: Storage,
    catalog: Arc<Catalog>,
    remote: Arc<FakeRemote>,
    settings: SyncSettings,
) -> PathwayServices {
    services_at(storage, catalog, remote, settings, fixed_clock())
}

pub fn services_at(
    storage: Storage,
    catalog: Arc<Catalog>,
    remote: Arc<FakeRemote>,
    settings: SyncSettings,
    clock: Clock,
) -> PathwayServices {
    PathwayServices::with_storage(
        storage,
        catalog,
        Remotes {
            progress: Arc::clone(&remote) as Arc<dyn ProgressRemote>,
            comments: remote,
        },
        settings,
        clock,
    )
}

/// In-memory backend that yields to the scheduler before every access, the
/// way a real database round trip does.
#[derive(Clone, Default)]
pub struct YieldingKv {
    inner: InMemoryKv,
}

#[async_trait]
impl KeyValueStore for YieldingKv {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        tokio::task::yield_now().await;
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.remove_item(key).await
    }
}

/// In-memory stand-in for the remote progress and comment services.
#[derive(Default)]
pub struct FakeRemote {
    records: Mutex<HashMap<ProgressKey, ProgressRecord>>,
    threads: Mutex<HashMap<CommentScope, Vec<Comment>>>,
    failing: AtomicBool,
    delay: Mutex<Duration>,
    lists: AtomicUsize,
    upserts: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let remote = Self::default();
        remote.failing.store(true, Ordering::SeqCst);
        Arc::new(remote)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn insert(&self, key: ProgressKey, record: ProgressRecord) {
        self.records.lock().unwrap().insert(key, record);
    }

    pub fn record(&self, key: &ProgressKey) -> Option<ProgressRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn insert_comment(&self, scope: CommentScope, comment: Comment) {
        self.threads
            .lock()
            .unwrap()
            .entry(scope)
            .or_default()
            .push(comment);
    }

    pub fn thread(&self, scope: &CommentScope) -> Vec<Comment> {
        self.threads
            .lock()
            .unwrap()
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    async fn latency(&self) -> Result<(), RemoteError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::HttpStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressRemote for FakeRemote {
    async fn list_progress(&self) -> Result<Vec<RemoteProgress>, RemoteError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.latency().await?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(key, record)| RemoteProgress {
                key: key.clone(),
                record: record.clone(),
            })
            .collect())
    }

    async fn upsert_progress(
        &self,
        key: &ProgressKey,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.latency().await?;
        self.insert(key.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl CommentRemote for FakeRemote {
    async fn list_comments(&self, scope: &CommentScope) -> Result<Vec<Comment>, RemoteError> {
        self.latency().await?;
        Ok(self.thread(scope))
    }

    async fn append_comment(
        &self,
        scope: &CommentScope,
        comment: &Comment,
    ) -> Result<(), RemoteError> {
        self.latency().await?;
        self.insert_comment(scope.clone(), comment.clone());
        Ok(())
    }
}
