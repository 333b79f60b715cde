//! Recompute-on-event: every mutation or lifecycle event re-derives the
//! aggregate from the local snapshot and pushes it to subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pathway_core::model::Catalog;
use pathway_core::{Aggregator, ProgressReport};
use rand::{Rng, rng};
use storage::ProgressStore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A view showing progress appeared.
    Mount,
    /// The hosting surface regained focus.
    Focus,
    /// Safety-net timer.
    Timer,
    /// A submit or reset just wrote the store.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ProgressReport, Trigger) + Send + Sync>;

pub struct RecomputeTrigger {
    catalog: Arc<Catalog>,
    store: Arc<ProgressStore>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    latest: Mutex<Option<ProgressReport>>,
}

impl RecomputeTrigger {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, store: Arc<ProgressStore>) -> Self {
        Self {
            catalog,
            store,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            latest: Mutex::new(None),
        }
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ProgressReport, Trigger) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Re-scan the store, refresh the overall cache and notify subscribers.
    pub async fn fire(&self, trigger: Trigger) -> ProgressReport {
        let snapshot = self.store.snapshot(&self.catalog).await;
        let report = Aggregator::new(&self.catalog, &snapshot).report();
        self.store.cache_overall(report.overall).await;

        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());

        // listeners may subscribe or unsubscribe from inside the callback
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(
            ?trigger,
            overall = report.overall,
            listeners = listeners.len(),
            "recomputed progress"
        );
        for listener in listeners {
            listener(&report, trigger);
        }
        report
    }

    #[must_use]
    pub fn latest(&self) -> Option<ProgressReport> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fire [`Trigger::Timer`] every `period` until `cancel` fires.
    ///
    /// The first tick is delayed by the period plus up to a tenth of it, so
    /// several surfaces started together do not recompute in lockstep.
    pub fn spawn_safety_net(
        self: &Arc<Self>,
        period: Duration,
        cancel: CancelToken,
    ) -> JoinHandle<()> {
        let period = period.max(Duration::from_millis(1));
        let start = Instant::now() + period + start_jitter(period);
        let trigger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        trigger.fire(Trigger::Timer).await;
                    }
                }
            }
            tracing::debug!("safety-net recompute stopped");
        })
    }
}

fn start_jitter(period: Duration) -> Duration {
    let max_ms = u64::try_from(period.as_millis() / 10).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng().random_range(0..=max_ms))
}
