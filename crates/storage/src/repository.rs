use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::comment_store::CommentStore;
use crate::local::LocalCache;
use crate::progress_store::ProgressStore;

/// Errors surfaced by key-value backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Quota exceeded or storage disabled.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Client-resident string key-value store.
///
/// Values are opaque strings (JSON documents in practice). Implementations
/// touch only the key they are given.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` when the backend refuses writes.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral sessions.
///
/// An optional byte quota makes writes fail the way a full browser store does.
#[derive(Clone, Default)]
pub struct InMemoryKv {
    items: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl InMemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push total key + value bytes past `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            quota_bytes: Some(quota_bytes),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().map_or(0, |guard| guard.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::Unavailable("quota exceeded".into()));
            }
        }
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Progress and comment stores sharing one backend, for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<ProgressStore>,
    pub comments: Arc<CommentStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_kv(Arc::new(InMemoryKv::new()))
    }

    #[must_use]
    pub fn from_kv(kv: Arc<dyn KeyValueStore>) -> Self {
        let cache = Arc::new(LocalCache::new(kv));
        Self {
            progress: Arc::new(ProgressStore::new(Arc::clone(&cache))),
            comments: Arc::new(CommentStore::new(cache)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let kv = InMemoryKv::new();
        kv.set_item("a", "1").await.unwrap();
        assert_eq!(kv.get_item("a").await.unwrap().as_deref(), Some("1"));
        kv.remove_item("a").await.unwrap();
        assert_eq!(kv.get_item("a").await.unwrap(), None);
        kv.remove_item("a").await.unwrap();
    }

    #[tokio::test]
    async fn quota_rejects_oversized_writes() {
        let kv = InMemoryKv::with_quota(8);
        kv.set_item("k", "1234").await.unwrap();
        let err = kv.set_item("j", "12345").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        // overwriting the same key only counts the new value
        kv.set_item("k", "1234567").await.unwrap();
    }
}
