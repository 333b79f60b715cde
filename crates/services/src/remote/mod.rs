//! Remote collaborators: the progress service of record and the comment service.
//!
//! Both are best-effort mirrors. Callers bound every call with
//! [`call_bounded`] and always keep a local fallback.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pathway_core::model::{Comment, CommentScope, ProgressKey, ProgressRecord};

use crate::cancel::CancelToken;
use crate::error::RemoteError;

mod http;

pub use http::HttpRemote;

/// One record as listed by the remote progress service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProgress {
    pub key: ProgressKey,
    pub record: ProgressRecord,
}

#[async_trait]
pub trait ProgressRemote: Send + Sync {
    /// List every progress record of the current user.
    async fn list_progress(&self) -> Result<Vec<RemoteProgress>, RemoteError>;

    /// Insert or replace the record for one (track, level).
    async fn upsert_progress(
        &self,
        key: &ProgressKey,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait CommentRemote: Send + Sync {
    async fn list_comments(&self, scope: &CommentScope) -> Result<Vec<Comment>, RemoteError>;

    async fn append_comment(
        &self,
        scope: &CommentScope,
        comment: &Comment,
    ) -> Result<(), RemoteError>;
}

/// Stand-in used when no remote is configured. Every call reports `Disabled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

#[async_trait]
impl ProgressRemote for OfflineRemote {
    async fn list_progress(&self) -> Result<Vec<RemoteProgress>, RemoteError> {
        Err(RemoteError::Disabled)
    }

    async fn upsert_progress(
        &self,
        _key: &ProgressKey,
        _record: &ProgressRecord,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Disabled)
    }
}

#[async_trait]
impl CommentRemote for OfflineRemote {
    async fn list_comments(&self, _scope: &CommentScope) -> Result<Vec<Comment>, RemoteError> {
        Err(RemoteError::Disabled)
    }

    async fn append_comment(
        &self,
        _scope: &CommentScope,
        _comment: &Comment,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Disabled)
    }
}

/// Run a remote call under a timeout, abandoning it if `cancel` fires first.
pub(crate) async fn call_bounded<T, F>(
    timeout: Duration,
    cancel: &CancelToken,
    call: F,
) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RemoteError::Cancelled),
        result = tokio::time::timeout(timeout, call) => {
            result.unwrap_or_else(|_elapsed| Err(RemoteError::Timeout(timeout)))
        }
    }
}

/// Log a degraded remote call at a level matching how surprising it is.
pub(crate) fn log_remote_failure(operation: &'static str, err: &RemoteError) {
    match err {
        RemoteError::Disabled | RemoteError::Cancelled => {
            tracing::debug!(operation, error = %err, "remote call skipped");
        }
        _ => tracing::warn!(operation, error = %err, "remote unreachable; using local data"),
    }
}
