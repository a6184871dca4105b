//! Error types for lineage-merge

use crate::similarity::EmbeddingError;
use lineage_common::TopicId;
use thiserror::Error;

/// Errors that abort a merge run
///
/// Any of these raised after the run's transaction is opened rolls the whole
/// run back.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Manual-merge topic ids that are not non-negative integers
    #[error("The following topic IDs are invalid (non-integer): {0:?}")]
    InvalidTopicIds(Vec<String>),

    /// Manual-merge topic ids absent from the store
    #[error("The following topic IDs were not found: {0:?}")]
    TopicsNotFound(Vec<TopicId>),

    /// Renumbering map could not be read or parsed
    #[error("Crosswalk error: {0}")]
    Crosswalk(#[from] csv::Error),

    /// Embedding service failure
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Reading the reviewer's answer failed
    #[error("Review I/O error: {0}")]
    Review(#[source] std::io::Error),

    /// Database error raised directly by sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// lineage-common error
    #[error(transparent)]
    Common(#[from] lineage_common::Error),
}

/// Result type for merge operations
pub type MergeResult<T> = Result<T, MergeError>;
