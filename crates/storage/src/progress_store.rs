use std::sync::Arc;

use pathway_core::model::{Catalog, LevelSlug, ProgressKey, ProgressRecord, TrackSlug};
use pathway_core::ProgressSnapshot;

use crate::keys::{OVERALL_PROGRESS_KEY, progress_key};
use crate::local::{LocalCache, WriteOutcome};
use crate::record::{decode_progress, encode_progress};

/// The single access point for persisted progress records.
///
/// Reads never fail: a missing, unreadable or corrupt entry is absent.
/// Writes never fail either; see [`WriteOutcome`].
pub struct ProgressStore {
    cache: Arc<LocalCache>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self { cache }
    }

    pub async fn get(&self, track: &TrackSlug, level: &LevelSlug) -> Option<ProgressRecord> {
        let key = progress_key(track, level);
        let raw = self.cache.get_raw(&key).await?;
        match decode_progress(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "discarding corrupt progress entry");
                None
            }
        }
    }

    /// Overwrite the entry for (track, level). Last call wins.
    pub async fn set(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        record: &ProgressRecord,
    ) -> WriteOutcome {
        let key = progress_key(track, level);
        match encode_progress(record) {
            Ok(raw) => self.cache.set_raw(&key, raw).await,
            // encoding a well-formed record cannot fail; keep the previous value if it does
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to encode progress record");
                WriteOutcome::SessionOnly
            }
        }
    }

    /// Remove the entry for (track, level), used by "reset attempt".
    pub async fn clear(&self, track: &TrackSlug, level: &LevelSlug) -> WriteOutcome {
        self.cache.remove_raw(&progress_key(track, level)).await
    }

    /// Load every record the catalog can refer to.
    pub async fn snapshot(&self, catalog: &Catalog) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot::new();
        for (track, level) in catalog.level_keys() {
            if let Some(record) = self.get(track, level.slug()).await {
                snapshot.insert(ProgressKey::new(track.clone(), level.slug().clone()), record);
            }
        }
        snapshot
    }

    /// Last cached overall percentage, if any and well-formed.
    pub async fn cached_overall(&self) -> Option<u8> {
        let raw = self.cache.get_raw(OVERALL_PROGRESS_KEY).await?;
        match raw.trim().parse::<u8>() {
            Ok(value) if value <= 100 => Some(value),
            _ => {
                tracing::warn!(value = %raw, "discarding corrupt overall progress cache");
                None
            }
        }
    }

    pub async fn cache_overall(&self, percentage: u8) -> WriteOutcome {
        self.cache
            .set_raw(OVERALL_PROGRESS_KEY, percentage.min(100).to_string())
            .await
    }

    #[must_use]
    pub fn is_session_only(&self) -> bool {
        self.cache.is_session_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryKv, KeyValueStore};
    use pathway_core::model::{Challenge, ChallengeId, Level, Track};
    use pathway_core::time::fixed_now;

    fn slugs(t: &str, l: &str) -> (TrackSlug, LevelSlug) {
        (TrackSlug::new(t).unwrap(), LevelSlug::new(l).unwrap())
    }

    fn store_with(kv: InMemoryKv) -> ProgressStore {
        ProgressStore::new(Arc::new(LocalCache::new(Arc::new(kv))))
    }

    #[tokio::test]
    async fn set_then_get_round_trips_field_for_field() {
        let store = store_with(InMemoryKv::new());
        let (track, level) = slugs("css", "beginner");
        let mut record = ProgressRecord::new(3, fixed_now());
        record.submit(0, "color: red;", "color: red;", fixed_now()).unwrap();
        record.submit(2, "nope", "margin: 0;", fixed_now()).unwrap();

        assert_eq!(store.set(&track, &level, &record).await, WriteOutcome::Durable);
        assert_eq!(store.get(&track, &level).await, Some(record));
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_absent_and_is_repaired_by_set() {
        let kv = InMemoryKv::new();
        kv.set_item("progress-css-beginner", "{\"userAnswers\": [")
            .await
            .unwrap();
        let store = store_with(kv.clone());
        let (track, level) = slugs("css", "beginner");

        assert_eq!(store.get(&track, &level).await, None);

        let record = ProgressRecord::new(2, fixed_now());
        store.set(&track, &level, &record).await;
        assert_eq!(store.get(&track, &level).await, Some(record));
    }

    #[tokio::test]
    async fn clear_touches_only_its_key() {
        let store = store_with(InMemoryKv::new());
        let (track, beginner) = slugs("css", "beginner");
        let advanced = LevelSlug::new("advanced").unwrap();
        let record = ProgressRecord::new(1, fixed_now());
        store.set(&track, &beginner, &record).await;
        store.set(&track, &advanced, &record).await;

        store.clear(&track, &beginner).await;

        assert_eq!(store.get(&track, &beginner).await, None);
        assert_eq!(store.get(&track, &advanced).await, Some(record));
    }

    #[tokio::test]
    async fn snapshot_covers_catalog_levels_only() {
        let store = store_with(InMemoryKv::new());
        let (track, level) = slugs("css", "beginner");
        let (other_track, other_level) = slugs("retired", "beginner");
        let record = ProgressRecord::new(1, fixed_now());
        store.set(&track, &level, &record).await;
        store.set(&other_track, &other_level, &record).await;

        let catalog = Catalog::new(vec![Track::new(
            track.clone(),
            "CSS",
            vec![Level::new(
                level.clone(),
                "Beginner",
                vec![Challenge::new(ChallengeId::new("c1").unwrap(), "p", "s", None)],
                vec![],
            )],
        )])
        .unwrap();

        let snapshot = store.snapshot(&catalog).await;
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn overall_cache_is_disposable() {
        let kv = InMemoryKv::new();
        let store = store_with(kv.clone());
        assert_eq!(store.cached_overall().await, None);

        store.cache_overall(42).await;
        assert_eq!(store.cached_overall().await, Some(42));

        kv.set_item(OVERALL_PROGRESS_KEY, "banana").await.unwrap();
        assert_eq!(store.cached_overall().await, None);
    }
}
