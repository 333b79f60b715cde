use async_trait::async_trait;
use pathway_core::model::{Comment, CommentScope, LevelSlug, ProgressKey, ProgressRecord, TrackSlug};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use storage::record::StoredProgress;

use super::{CommentRemote, ProgressRemote, RemoteProgress};
use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// JSON-over-HTTP client for the progress and comment services.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemote {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| RemoteError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn comment_url(&self, scope: &CommentScope) -> Result<Url, RemoteError> {
        match scope {
            CommentScope::Level { track, level } => {
                self.url(&["comments", "levels", track.as_str(), level.as_str()])
            }
            CommentScope::Track { track } => self.url(&["comments", "tracks", track.as_str()]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressEntry {
    track_slug: TrackSlug,
    level_slug: LevelSlug,
    #[serde(flatten)]
    progress: StoredProgress,
}

#[async_trait]
impl ProgressRemote for HttpRemote {
    async fn list_progress(&self) -> Result<Vec<RemoteProgress>, RemoteError> {
        let response = self
            .authorize(self.client.get(self.url(&["progress"])?))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }

        let entries: Vec<ProgressEntry> = response.json().await?;
        let mut listed = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = ProgressKey::new(entry.track_slug, entry.level_slug);
            match entry.progress.into_record() {
                Ok(record) => listed.push(RemoteProgress { key, record }),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "skipping malformed remote record");
                }
            }
        }
        Ok(listed)
    }

    async fn upsert_progress(
        &self,
        key: &ProgressKey,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError> {
        let url = self.url(&["progress", key.track.as_str(), key.level.as_str()])?;
        let response = self
            .authorize(self.client.put(url))
            .json(&StoredProgress::from_record(record))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRemote for HttpRemote {
    async fn list_comments(&self, scope: &CommentScope) -> Result<Vec<Comment>, RemoteError> {
        let response = self
            .authorize(self.client.get(self.comment_url(scope)?))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn append_comment(
        &self,
        scope: &CommentScope,
        comment: &Comment,
    ) -> Result<(), RemoteError> {
        let response = self
            .authorize(self.client.post(self.comment_url(scope)?))
            .json(comment)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }
        Ok(())
    }
}
