use std::sync::Arc;

use pathway_core::model::{Comment, CommentScope};

use crate::keys::comments_key;
use crate::local::{LocalCache, WriteOutcome};

/// Append-only comment threads, one JSON array per scope.
pub struct CommentStore {
    cache: Arc<LocalCache>,
}

impl CommentStore {
    #[must_use]
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self { cache }
    }

    /// A corrupt thread reads as empty.
    pub async fn list(&self, scope: &CommentScope) -> Vec<Comment> {
        let key = comments_key(scope);
        let Some(raw) = self.cache.get_raw(&key).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Comment>>(&raw) {
            Ok(comments) => comments,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "discarding corrupt comment thread");
                Vec::new()
            }
        }
    }

    pub async fn append(&self, scope: &CommentScope, comment: Comment) -> WriteOutcome {
        let mut thread = self.list(scope).await;
        thread.push(comment);
        self.write(scope, &thread).await
    }

    /// Overwrite a whole thread, used after merging with the remote copy.
    pub async fn replace(&self, scope: &CommentScope, thread: &[Comment]) -> WriteOutcome {
        self.write(scope, thread).await
    }

    async fn write(&self, scope: &CommentScope, thread: &[Comment]) -> WriteOutcome {
        let key = comments_key(scope);
        match serde_json::to_string(thread) {
            Ok(raw) => self.cache.set_raw(&key, raw).await,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to encode comment thread");
                WriteOutcome::SessionOnly
            }
        }
    }
}
