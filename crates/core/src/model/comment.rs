use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ids::{LevelSlug, TrackSlug};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommentError {
    #[error("comment text cannot be empty")]
    EmptyText,

    #[error("comment author cannot be empty")]
    EmptyAuthor,
}

/// Where a comment thread lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentScope {
    Level { track: TrackSlug, level: LevelSlug },
    Track { track: TrackSlug },
}

impl CommentScope {
    #[must_use]
    pub fn level(track: TrackSlug, level: LevelSlug) -> Self {
        Self::Level { track, level }
    }

    #[must_use]
    pub fn track(track: TrackSlug) -> Self {
        Self::Track { track }
    }
}

/// A single entry in an append-only comment thread.
///
/// Field names match the stored JSON shape (`user`, not `author`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    id: Uuid,
    #[serde(rename = "user")]
    author: String,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Comment {
    /// Create a new comment with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `CommentError` if the author or the text is blank after trimming.
    pub fn new(author: &str, text: &str, now: DateTime<Utc>) -> Result<Self, CommentError> {
        let author = author.trim();
        if author.is_empty() {
            return Err(CommentError::EmptyAuthor);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            author: author.to_owned(),
            text: text.to_owned(),
            timestamp: now,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Union two threads by id, ordered by timestamp then id.
///
/// When both sides carry the same id, the entry from `primary` is kept.
#[must_use]
pub fn merge_threads(primary: Vec<Comment>, secondary: Vec<Comment>) -> Vec<Comment> {
    let mut merged = primary;
    for comment in secondary {
        if !merged.iter().any(|existing| existing.id == comment.id) {
            merged.push(comment);
        }
    }
    merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    merged
}
