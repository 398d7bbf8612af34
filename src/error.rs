//! Error types for store operations

use crate::entities::RatingError;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Episode not found")]
    EpisodeNotFound { id: i64 },

    #[error("Guest not found")]
    GuestNotFound { id: i64 },

    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// True for the "requested id has no matching row" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::EpisodeNotFound { .. } | StoreError::GuestNotFound { .. }
        )
    }
}
