//! Key naming for every entry the engine writes to the local store.

use pathway_core::model::{CommentScope, LevelSlug, TrackSlug};

/// Disposable cache of the last computed overall percentage.
pub const OVERALL_PROGRESS_KEY: &str = "overall-learning-progress";

#[must_use]
pub fn progress_key(track: &TrackSlug, level: &LevelSlug) -> String {
    format!("progress-{track}-{level}")
}

#[must_use]
pub fn comments_key(scope: &CommentScope) -> String {
    match scope {
        CommentScope::Level { track, level } => format!("comments-{track}-{level}"),
        CommentScope::Track { track } => format!("pathway-comments-{track}"),
    }
}
