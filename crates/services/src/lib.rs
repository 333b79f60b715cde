#![forbid(unsafe_code)]

pub mod app_services;
pub mod cancel;
pub mod comment_service;
pub mod config;
pub mod error;
pub mod progress_service;
pub mod remote;
pub mod sync_bridge;
pub mod trigger;

pub use pathway_core::Clock;

pub use app_services::{PathwayServices, Remotes};
pub use cancel::CancelToken;
pub use comment_service::{CommentPosted, CommentService};
pub use config::{PathwayConfig, RemoteConfig, SyncSettings};
pub use error::{AppServicesError, CommentServiceError, ProgressServiceError, RemoteError};
pub use progress_service::{LevelSync, ProgressService, ResetOutcome, SubmitOutcome, SyncReport};
pub use remote::{CommentRemote, HttpRemote, OfflineRemote, ProgressRemote, RemoteProgress};
pub use sync_bridge::{Pulled, PushOutcome, SyncBridge, SyncStatus};
pub use trigger::{RecomputeTrigger, SubscriptionId, Trigger};
