use thiserror::Error;

use super::location::BlobLocation;

/// Failure of a blob store operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(BlobLocation),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the caller's stream failed; nothing was kept.
    #[error("failed to read blob source: {0}")]
    Source(#[source] std::io::Error),

    #[error("invalid blob location: {0}")]
    InvalidLocation(String),

    /// The stream ran past the store's size ceiling; nothing was kept.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl StorageError {
    /// True for a missing blob, including an IO `NotFound` surfaced mid-read.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
