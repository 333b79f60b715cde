//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use pathway_core::model::{CommentError, LevelSlug, ProgressError, TrackSlug};
use storage::sqlite::SqliteInitError;

/// Failures talking to the remote progress or comment service.
///
/// These never leave the sync layer as errors; they are logged and turned
/// into "absent" / "not synced" results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote sync is not configured")]
    Disabled,
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote call abandoned")]
    Cancelled,
    #[error("invalid remote url: {0}")]
    InvalidUrl(String),
    #[error("remote request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ProgressService`. All are raised before anything is persisted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("unknown level {track}/{level}")]
    UnknownLevel { track: TrackSlug, level: LevelSlug },
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted by `CommentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommentServiceError {
    #[error(transparent)]
    Comment(#[from] CommentError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
