use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::repository::KeyValueStore;

/// Where a write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Written to the persistent backend.
    Durable,
    /// Backend refused writes earlier; held in memory for this session only.
    SessionOnly,
}

impl WriteOutcome {
    #[must_use]
    pub fn is_durable(self) -> bool {
        matches!(self, WriteOutcome::Durable)
    }
}

/// Raw string access to the backend with a session-only fallback.
///
/// The first failed write switches the cache into session-only mode: that
/// write and every later one go to an in-memory overlay, and reads consult
/// the overlay before the backend. A `None` overlay entry is a removal.
pub struct LocalCache {
    kv: Arc<dyn KeyValueStore>,
    overlay: Mutex<HashMap<String, Option<String>>>,
    session_only: AtomicBool,
}

impl LocalCache {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            overlay: Mutex::new(HashMap::new()),
            session_only: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_session_only(&self) -> bool {
        self.session_only.load(Ordering::Acquire)
    }

    /// Read failures are logged and reported as absent.
    pub async fn get_raw(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.overlay_entry(key) {
            return entry;
        }
        match self.kv.get_item(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "local store read failed");
                None
            }
        }
    }

    pub async fn set_raw(&self, key: &str, value: String) -> WriteOutcome {
        if !self.is_session_only() {
            match self.kv.set_item(key, &value).await {
                Ok(()) => return WriteOutcome::Durable,
                Err(err) => self.enter_session_only(key, &err),
            }
        }
        self.put_overlay(key, Some(value));
        WriteOutcome::SessionOnly
    }

    pub async fn remove_raw(&self, key: &str) -> WriteOutcome {
        if !self.is_session_only() {
            match self.kv.remove_item(key).await {
                Ok(()) => return WriteOutcome::Durable,
                Err(err) => self.enter_session_only(key, &err),
            }
        }
        self.put_overlay(key, None);
        WriteOutcome::SessionOnly
    }

    fn enter_session_only(&self, key: &str, err: &crate::repository::StorageError) {
        if !self.session_only.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                key,
                error = %err,
                "local store unavailable; keeping writes in memory for this session"
            );
        }
    }

    fn overlay_entry(&self, key: &str) -> Option<Option<String>> {
        if !self.is_session_only() {
            return None;
        }
        self.overlay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put_overlay(&self, key: &str, value: Option<String>) {
        self.overlay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKv;

    #[tokio::test]
    async fn failed_write_switches_to_session_only() {
        let kv = InMemoryKv::with_quota(10);
        let cache = LocalCache::new(Arc::new(kv.clone()));

        assert_eq!(cache.set_raw("a", "1".into()).await, WriteOutcome::Durable);
        assert_eq!(
            cache.set_raw("b", "a value that is too long".into()).await,
            WriteOutcome::SessionOnly
        );
        assert!(cache.is_session_only());

        // later writes stay in memory even when they would fit
        assert_eq!(cache.set_raw("c", "3".into()).await, WriteOutcome::SessionOnly);
        assert_eq!(kv.get_item("c").await.unwrap(), None);

        assert_eq!(cache.get_raw("b").await.as_deref(), Some("a value that is too long"));
        assert_eq!(cache.get_raw("a").await.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn session_only_removal_hides_backend_value() {
        let kv = InMemoryKv::with_quota(4);
        let cache = LocalCache::new(Arc::new(kv.clone()));
        cache.set_raw("a", "1".into()).await;
        cache.set_raw("b", "too long".into()).await;

        assert_eq!(cache.remove_raw("a").await, WriteOutcome::SessionOnly);
        assert_eq!(cache.get_raw("a").await, None);
        assert_eq!(kv.get_item("a").await.unwrap().as_deref(), Some("1"));
    }
}
