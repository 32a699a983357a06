/// Errors surfaced by a [`crate::CommentStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("comment not found")]
    NotFound,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Errors returned to callers of [`crate::Composer`].
///
/// `Validation` is raised client-side before any store call is attempted.
/// None of these are retried automatically; the caller decides whether to
/// resubmit.
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("comment not found")]
    NotFound,

    #[error("network failure: {0}")]
    Network(String),

    #[error("store error: {0}")]
    Store(anyhow::Error),
}

impl From<StoreError> for CommentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => CommentError::PermissionDenied,
            StoreError::NotFound => CommentError::NotFound,
            StoreError::Validation(msg) => CommentError::Validation(msg),
            StoreError::Network(msg) => CommentError::Network(msg),
            StoreError::Backend(err) => CommentError::Store(err),
        }
    }
}
