use common::storage::{BlobLocation, StorageError};
use sea_orm::DbErr;
use thiserror::Error;

use super::validator::ValidationError;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("document {0} not found")]
    NotFound(i32),

    /// The index has a row but the blob it points at is gone.
    #[error("content of document {id} is missing from blob storage (location {location})")]
    ContentMissing { id: i32, location: BlobLocation },

    /// The blob exists but its size disagrees with the index.
    #[error("content of document {id} is corrupted: expected {expected} bytes, found {actual}")]
    Corrupted { id: i32, expected: u64, actual: u64 },

    #[error("blob storage failure: {0}")]
    Blob(#[source] StorageError),

    #[error("metadata index failure: {0}")]
    Index(#[source] DbErr),
}

/// A compensating delete that did not go through.
///
/// Logged when raised; the blob is left for the orphan sweep.
#[derive(Debug, Error)]
#[error("failed to remove orphaned blob {location}: {source}")]
pub struct OrphanCleanupFailure {
    pub location: BlobLocation,
    #[source]
    pub source: StorageError,
}
