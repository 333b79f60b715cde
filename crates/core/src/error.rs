use thiserror::Error;

use crate::model::{CatalogError, CommentError, ProgressError, SlugError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Comment(#[from] CommentError),
}
