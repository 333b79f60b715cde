use std::sync::Arc;

use pathway_core::merge::{Resolution, resolve};
use pathway_core::model::{
    Catalog, ChallengeStatus, Level, LevelSlug, ProgressError, ProgressKey, ProgressRecord,
    ResetPolicy, TrackSlug,
};
use pathway_core::ProgressReport;
use storage::{ProgressStore, WriteOutcome};
use tokio::sync::Mutex;

use crate::Clock;
use crate::cancel::CancelToken;
use crate::error::ProgressServiceError;
use crate::remote::RemoteProgress;
use crate::sync_bridge::{Pulled, SyncBridge, SyncStatus};
use crate::trigger::{RecomputeTrigger, SubscriptionId, Trigger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub status: ChallengeStatus,
    pub durability: WriteOutcome,
    pub sync: SyncStatus,
    pub report: ProgressReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    /// `false` when the challenge was already unattempted and nothing was written.
    pub changed: bool,
    pub durability: WriteOutcome,
    pub sync: SyncStatus,
    pub report: ProgressReport,
}

/// What reconciliation did for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSync {
    /// No record on either side.
    Nothing,
    InSync,
    /// The remote record replaced the local one.
    RemoteApplied,
    /// The local record was newer and was pushed back.
    LocalPushed(SyncStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// The remote could not be reached; local state is untouched.
    Unreachable,
    /// The caller cancelled before results were applied.
    Abandoned,
    Reconciled(Vec<(ProgressKey, LevelSync)>),
}

impl SyncReport {
    /// Whether any local record was replaced.
    #[must_use]
    pub fn applied_remote(&self) -> bool {
        match self {
            SyncReport::Reconciled(levels) => levels
                .iter()
                .any(|(_, outcome)| *outcome == LevelSync::RemoteApplied),
            SyncReport::Unreachable | SyncReport::Abandoned => false,
        }
    }
}

/// Answer submission, resets and reconciliation for progress records.
///
/// Every mutation writes the local store first, recomputes and notifies,
/// then makes one bounded attempt to push to the remote. Read-modify-write
/// of stored records goes through one lock shared by all clones, so
/// concurrent mutations never overwrite each other.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<Catalog>,
    store: Arc<ProgressStore>,
    bridge: Arc<SyncBridge>,
    trigger: Arc<RecomputeTrigger>,
    reset_policy: ResetPolicy,
    cancel: CancelToken,
    writes: Arc<Mutex<()>>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        store: Arc<ProgressStore>,
        bridge: Arc<SyncBridge>,
        trigger: Arc<RecomputeTrigger>,
    ) -> Self {
        Self {
            clock,
            catalog,
            store,
            bridge,
            trigger,
            reset_policy: ResetPolicy::default(),
            cancel: CancelToken::new(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    #[must_use]
    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    /// A handle sharing every collaborator but owning its own cancel token,
    /// so one surface can be torn down without affecting the others.
    #[must_use]
    pub fn scoped(&self) -> Self {
        Self {
            cancel: CancelToken::new(),
            ..self.clone()
        }
    }

    /// Abandon in-flight pushes started by this handle.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ProgressReport, Trigger) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.trigger.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.trigger.unsubscribe(id)
    }

    /// Grade `answer` for challenge `index` of a level and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLevel` for a level missing from
    /// the catalog and `ProgressServiceError::Progress` for an empty answer,
    /// an out-of-range index or a challenge that was already graded. Nothing
    /// is written in either case.
    pub async fn submit(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        index: usize,
        answer: &str,
    ) -> Result<SubmitOutcome, ProgressServiceError> {
        let definition = self.level(track, level)?;
        let challenge = definition
            .challenge(index)
            .ok_or(ProgressError::ChallengeOutOfRange {
                index,
                len: definition.total_challenges(),
            })?;

        let (record, status, durability) = {
            let _write = self.writes.lock().await;
            let now = self.clock.now();
            let mut record = self.current(track, definition, now).await;
            let status = record.submit(index, answer, challenge.solution(), now)?;
            let durability = self.store.set(track, level, &record).await;
            (record, status, durability)
        };
        let report = self.trigger.fire(Trigger::Mutation).await;
        let sync = self.push(track, level, &record).await;
        tracing::debug!(%track, %level, index, ?status, ?sync, "answer submitted");

        Ok(SubmitOutcome {
            status,
            durability,
            sync,
            report,
        })
    }

    /// Return challenge `index` to unattempted under the service's reset policy.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLevel` for a level missing from
    /// the catalog, and `ProgressServiceError::Progress` for an out-of-range
    /// index or a solved challenge when solved challenges are terminal.
    pub async fn reset_challenge(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        index: usize,
    ) -> Result<ResetOutcome, ProgressServiceError> {
        let definition = self.level(track, level)?;
        let written = {
            let _write = self.writes.lock().await;
            let now = self.clock.now();
            let mut record = self.current(track, definition, now).await;
            let before = record.clone();
            record.reset(index, self.reset_policy, now)?;
            if record == before {
                None
            } else {
                let durability = self.store.set(track, level, &record).await;
                Some((record, durability))
            }
        };

        let Some((record, durability)) = written else {
            return Ok(ResetOutcome {
                changed: false,
                durability: self.current_durability(),
                sync: SyncStatus::Skipped,
                report: self.trigger.fire(Trigger::Mutation).await,
            });
        };

        let report = self.trigger.fire(Trigger::Mutation).await;
        let sync = self.push(track, level, &record).await;
        Ok(ResetOutcome {
            changed: true,
            durability,
            sync,
            report,
        })
    }

    /// Drop every answer of a level, locally and on the remote.
    ///
    /// The level is overwritten with a fresh, timestamped record rather than
    /// removed, so the reset outlives a failed push and wins the next sync.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLevel` for a level missing from the catalog.
    pub async fn reset_level(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
    ) -> Result<ResetOutcome, ProgressServiceError> {
        let definition = self.level(track, level)?;
        let (empty, durability) = {
            let _write = self.writes.lock().await;
            let empty = ProgressRecord::for_level(definition, self.clock.now());
            let durability = self.store.set(track, level, &empty).await;
            (empty, durability)
        };
        let report = self.trigger.fire(Trigger::Mutation).await;
        let sync = self.push(track, level, &empty).await;
        Ok(ResetOutcome {
            changed: true,
            durability,
            sync,
            report,
        })
    }

    /// Current record for display, aligned to the catalog level.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLevel` for a level missing from the catalog.
    pub async fn level_progress(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let definition = self.level(track, level)?;
        Ok(self.current(track, definition, self.clock.now()).await)
    }

    /// Reconcile one level with the remote.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLevel` for a level missing from the catalog.
    pub async fn sync_level(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        cancel: &CancelToken,
    ) -> Result<SyncReport, ProgressServiceError> {
        let definition = self.level(track, level)?;
        let remote = match self.bridge.fetch(track, level, cancel).await {
            Pulled::Unavailable if cancel.is_cancelled() => return Ok(SyncReport::Abandoned),
            Pulled::Unavailable => return Ok(SyncReport::Unreachable),
            Pulled::NotFound => None,
            Pulled::Record(record) => Some(record),
        };
        if cancel.is_cancelled() {
            return Ok(SyncReport::Abandoned);
        }
        let outcome = self.reconcile(track, definition, remote, cancel).await;
        Ok(SyncReport::Reconciled(vec![(
            ProgressKey::new(track.clone(), level.clone()),
            outcome,
        )]))
    }

    /// Reconcile every catalog level with the remote in one list request.
    /// Remote records for levels outside the catalog are ignored.
    pub async fn sync_all(&self, cancel: &CancelToken) -> SyncReport {
        let Some(listing) = self.bridge.pull_all(cancel).await else {
            return if cancel.is_cancelled() {
                SyncReport::Abandoned
            } else {
                SyncReport::Unreachable
            };
        };

        let mut levels = Vec::new();
        for (track, definition) in self.catalog.level_keys() {
            if cancel.is_cancelled() {
                return SyncReport::Abandoned;
            }
            let remote = find_remote(&listing, track, definition.slug());
            let outcome = self.reconcile(track, definition, remote, cancel).await;
            levels.push((ProgressKey::new(track.clone(), definition.slug().clone()), outcome));
        }
        SyncReport::Reconciled(levels)
    }

    /// React to a lifecycle event. `Mount` and `Focus` reconcile with the
    /// remote before recomputing; `Timer` and `Mutation` only recompute.
    pub async fn handle(&self, trigger: Trigger, cancel: &CancelToken) -> ProgressReport {
        if matches!(trigger, Trigger::Mount | Trigger::Focus) {
            let report = self.sync_all(cancel).await;
            tracing::debug!(?trigger, ?report, "reconciled before recompute");
        }
        self.trigger.fire(trigger).await
    }

    async fn reconcile(
        &self,
        track: &TrackSlug,
        definition: &Level,
        remote: Option<ProgressRecord>,
        cancel: &CancelToken,
    ) -> LevelSync {
        let total = definition.total_challenges();
        let level = definition.slug();
        let remote = remote.map(|record| record.aligned_to(total));

        let local = {
            let _write = self.writes.lock().await;
            let local = self
                .store
                .get(track, level)
                .await
                .map(|record| record.aligned_to(total));
            match (resolve(local.as_ref(), remote.as_ref()), remote) {
                (Resolution::Nothing, _) => return LevelSync::Nothing,
                (Resolution::InSync, _) => return LevelSync::InSync,
                (Resolution::TakeRemote, Some(remote)) => {
                    self.store.set(track, level, &remote).await;
                    tracing::debug!(%track, %level, "applied remote progress");
                    return LevelSync::RemoteApplied;
                }
                (Resolution::TakeRemote, None) | (Resolution::KeepLocal, _) => local,
            }
        };

        let Some(local) = local else {
            return LevelSync::Nothing;
        };
        let pushed = self.bridge.push(track, level, &local, cancel).await;
        LevelSync::LocalPushed(pushed.into())
    }

    fn level(&self, track: &TrackSlug, level: &LevelSlug) -> Result<&Level, ProgressServiceError> {
        self.catalog
            .level(track, level)
            .ok_or_else(|| ProgressServiceError::UnknownLevel {
                track: track.clone(),
                level: level.clone(),
            })
    }

    async fn current(
        &self,
        track: &TrackSlug,
        definition: &Level,
        now: chrono::DateTime<chrono::Utc>,
    ) -> ProgressRecord {
        match self.store.get(track, definition.slug()).await {
            Some(record) => record.aligned_to(definition.total_challenges()),
            None => ProgressRecord::for_level(definition, now),
        }
    }

    fn current_durability(&self) -> WriteOutcome {
        if self.store.is_session_only() {
            WriteOutcome::SessionOnly
        } else {
            WriteOutcome::Durable
        }
    }

    async fn push(
        &self,
        track: &TrackSlug,
        level: &LevelSlug,
        record: &ProgressRecord,
    ) -> SyncStatus {
        if self.cancel.is_cancelled() {
            return SyncStatus::Skipped;
        }
        self.bridge.push(track, level, record, &self.cancel).await.into()
    }
}

fn find_remote(
    listing: &[RemoteProgress],
    track: &TrackSlug,
    level: &LevelSlug,
) -> Option<ProgressRecord> {
    listing
        .iter()
        .find(|entry| &entry.key.track == track && &entry.key.level == level)
        .map(|entry| entry.record.clone())
}
