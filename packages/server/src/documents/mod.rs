//! Document storage: the blob store and the metadata index kept consistent
//! by [`DocumentCoordinator`].

mod coordinator;
mod error;
pub mod index;
pub mod sweep;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use chrono::{DateTime, Utc};
use common::storage::{BlobLocation, BoxReader};

pub use coordinator::DocumentCoordinator;
pub use error::{DocumentError, OrphanCleanupFailure};
pub use index::{MetadataIndex, SeaOrmIndex};
pub use sweep::SweepReport;
pub use validator::{IngressValidator, UploadCandidate, ValidationError};

/// A committed document descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i32,
    pub name: String,
    pub location: BlobLocation,
    pub size: u64,
    pub content_type: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// A descriptor that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub location: BlobLocation,
    pub size: u64,
    pub content_type: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// An open download: the descriptor plus a reader over its content.
pub struct FetchedDocument {
    pub document: Document,
    pub reader: BoxReader,
}

impl FetchedDocument {
    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn size(&self) -> u64 {
        self.document.size
    }
}

impl fmt::Debug for FetchedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedDocument")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}
