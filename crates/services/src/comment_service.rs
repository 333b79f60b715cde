use std::sync::Arc;
use std::time::Duration;

use pathway_core::model::{Comment, CommentScope, merge_threads};
use storage::{CommentStore, WriteOutcome};

use crate::Clock;
use crate::cancel::CancelToken;
use crate::error::CommentServiceError;
use crate::remote::{CommentRemote, call_bounded, log_remote_failure};
use crate::sync_bridge::SyncStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPosted {
    pub comment: Comment,
    pub durability: WriteOutcome,
    pub sync: SyncStatus,
}

/// Level and track discussion threads, stored locally and mirrored remotely.
#[derive(Clone)]
pub struct CommentService {
    clock: Clock,
    store: Arc<CommentStore>,
    remote: Arc<dyn CommentRemote>,
    timeout: Duration,
    cancel: CancelToken,
}

impl CommentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<CommentStore>,
        remote: Arc<dyn CommentRemote>,
        timeout: Duration,
    ) -> Self {
        Self {
            clock,
            store,
            remote,
            timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Abandon in-flight remote appends started by this handle.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    /// Validate and append a comment to a thread.
    ///
    /// # Errors
    ///
    /// Returns `CommentServiceError::Comment` for a blank author or text.
    pub async fn post(
        &self,
        scope: &CommentScope,
        author: &str,
        text: &str,
    ) -> Result<CommentPosted, CommentServiceError> {
        let comment = Comment::new(author, text, self.clock.now())?;
        let durability = self.store.append(scope, comment.clone()).await;

        let sync = if self.cancel.is_cancelled() {
            SyncStatus::Skipped
        } else {
            match call_bounded(
                self.timeout,
                &self.cancel,
                self.remote.append_comment(scope, &comment),
            )
            .await
            {
                Ok(()) => SyncStatus::Synced,
                Err(err) => {
                    log_remote_failure("append_comment", &err);
                    SyncStatus::LocalOnly
                }
            }
        };

        Ok(CommentPosted {
            comment,
            durability,
            sync,
        })
    }

    /// The thread for `scope`, oldest first.
    ///
    /// When the remote answers, its thread is unioned with the local one by
    /// comment id and the result is written back locally. Otherwise the local
    /// thread is returned as is.
    pub async fn list(&self, scope: &CommentScope, cancel: &CancelToken) -> Vec<Comment> {
        let local = self.store.list(scope).await;
        let remote =
            match call_bounded(self.timeout, cancel, self.remote.list_comments(scope)).await {
                Ok(remote) => remote,
                Err(err) => {
                    log_remote_failure("list_comments", &err);
                    return merge_threads(local, Vec::new());
                }
            };

        let merged = merge_threads(remote, local);
        self.store.replace(scope, &merged).await;
        merged
    }
}
