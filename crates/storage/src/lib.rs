#![forbid(unsafe_code)]

pub mod comment_store;
pub mod keys;
pub mod local;
pub mod progress_store;
pub mod record;
pub mod repository;
pub mod sqlite;

pub use comment_store::CommentStore;
pub use local::WriteOutcome;
pub use progress_store::ProgressStore;
pub use repository::{InMemoryKv, KeyValueStore, Storage, StorageError};
