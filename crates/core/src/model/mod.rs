mod catalog;
mod comment;
mod ids;
mod progress;

pub use catalog::{Catalog, CatalogError, Challenge, Level, Resource, Track};
pub use comment::{Comment, CommentError, CommentScope, merge_threads};
pub use ids::{ChallengeId, LevelSlug, ProgressKey, SlugError, TrackSlug};
pub use progress::{ChallengeStatus, ProgressError, ProgressRecord, ResetPolicy};
