use std::sync::Arc;

use pathway_core::model::Catalog;
use storage::Storage;
use tokio::task::JoinHandle;

use crate::Clock;
use crate::cancel::CancelToken;
use crate::comment_service::CommentService;
use crate::config::{PathwayConfig, RemoteConfig, SyncSettings};
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::remote::{CommentRemote, HttpRemote, OfflineRemote, ProgressRemote};
use crate::sync_bridge::SyncBridge;
use crate::trigger::RecomputeTrigger;

/// Remote collaborators handed to [`PathwayServices::with_storage`].
#[derive(Clone)]
pub struct Remotes {
    pub progress: Arc<dyn ProgressRemote>,
    pub comments: Arc<dyn CommentRemote>,
}

impl Remotes {
    #[must_use]
    pub fn offline() -> Self {
        Self {
            progress: Arc::new(OfflineRemote),
            comments: Arc::new(OfflineRemote),
        }
    }

    /// HTTP remotes when configured, offline otherwise.
    #[must_use]
    pub fn from_config(config: Option<&RemoteConfig>) -> Self {
        match config {
            Some(config) => {
                let http = Arc::new(HttpRemote::new(config.clone()));
                Self {
                    progress: Arc::clone(&http) as Arc<dyn ProgressRemote>,
                    comments: http,
                }
            }
            None => Self::offline(),
        }
    }
}

/// Assembles the progress and comment services over one storage backend.
#[derive(Clone)]
pub struct PathwayServices {
    catalog: Arc<Catalog>,
    storage: Storage,
    settings: SyncSettings,
    trigger: Arc<RecomputeTrigger>,
    progress: Arc<ProgressService>,
    comments: Arc<CommentService>,
}

impl PathwayServices {
    /// Build services backed by `SQLite` storage and the configured remote.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        config: &PathwayConfig,
        catalog: Arc<Catalog>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::debug!(
            db_url = %config.db_url,
            remote = config.remote.is_some(),
            "opened progress storage"
        );
        Ok(Self::with_storage(
            storage,
            catalog,
            Remotes::from_config(config.remote.as_ref()),
            config.sync,
            clock,
        ))
    }

    #[must_use]
    pub fn with_storage(
        storage: Storage,
        catalog: Arc<Catalog>,
        remotes: Remotes,
        settings: SyncSettings,
        clock: Clock,
    ) -> Self {
        let trigger = Arc::new(RecomputeTrigger::new(
            Arc::clone(&catalog),
            Arc::clone(&storage.progress),
        ));
        let bridge = Arc::new(SyncBridge::new(remotes.progress, settings.request_timeout));
        let progress = Arc::new(
            ProgressService::new(
                clock,
                Arc::clone(&catalog),
                Arc::clone(&storage.progress),
                bridge,
                Arc::clone(&trigger),
            )
            .with_reset_policy(settings.reset_policy),
        );
        let comments = Arc::new(CommentService::new(
            clock,
            Arc::clone(&storage.comments),
            remotes.comments,
            settings.request_timeout,
        ));

        Self {
            catalog,
            storage,
            settings,
            trigger,
            progress,
            comments,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    #[must_use]
    pub fn trigger(&self) -> Arc<RecomputeTrigger> {
        Arc::clone(&self.trigger)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn comments(&self) -> Arc<CommentService> {
        Arc::clone(&self.comments)
    }

    /// Start the periodic recompute at the configured interval.
    pub fn start_safety_net(&self, cancel: CancelToken) -> JoinHandle<()> {
        self.trigger
            .spawn_safety_net(self.settings.refresh_interval, cancel)
    }
}
