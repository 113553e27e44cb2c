use std::sync::Arc;

use chrono::Utc;
use common::storage::{BlobLocation, BlobStore, StorageError};
use tokio::io::AsyncRead;
use tracing::{debug, error, info, instrument, warn};

use super::error::{DocumentError, OrphanCleanupFailure};
use super::index::MetadataIndex;
use super::validator::{IngressValidator, UploadCandidate, ValidationError};
use super::{Document, FetchedDocument, NewDocument};

/// Sequences blob store and index operations so that uploads and deletes
/// look atomic to callers.
///
/// Upload writes the blob before the row and removes the blob again if the
/// row cannot be written. Delete removes the blob before the row. Either way
/// an interruption can only leave a row without content (reported as
/// [`DocumentError::ContentMissing`]) or an unreferenced blob that the orphan
/// sweep reclaims.
///
/// Operations on the same id are not serialized; any of them may observe
/// [`DocumentError::NotFound`] when racing a delete.
#[derive(Clone)]
pub struct DocumentCoordinator {
    pub(super) blobs: Arc<dyn BlobStore>,
    pub(super) index: Arc<dyn MetadataIndex>,
    validator: Arc<IngressValidator>,
}

impl DocumentCoordinator {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn MetadataIndex>,
        validator: Arc<IngressValidator>,
    ) -> Self {
        Self {
            blobs,
            index,
            validator,
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.validator.max_size()
    }

    /// Validate, store and index an upload.
    ///
    /// Nothing is read from `stream` when validation rejects the candidate.
    #[instrument(skip(self, candidate, stream), fields(name = %candidate.name))]
    pub async fn submit_upload(
        &self,
        candidate: UploadCandidate<'_>,
        stream: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<Document, DocumentError> {
        self.validator.validate(&candidate)?;

        let stored = self.blobs.put_stream(stream).await.map_err(|e| match e {
            StorageError::SizeLimitExceeded { limit, .. } => {
                DocumentError::Validation(ValidationError::TooLarge { limit })
            }
            StorageError::Source(source) => {
                warn!(error = %source, "Upload stream failed");
                DocumentError::Validation(ValidationError::IncompleteUpload {
                    reason: source.to_string(),
                })
            }
            other => DocumentError::Blob(other),
        })?;

        if let Some(declared) = candidate.declared_size
            && declared != stored.size
        {
            self.remove_orphan(&stored.location).await;
            return Err(ValidationError::SizeMismatch {
                declared,
                actual: stored.size,
            }
            .into());
        }

        let new_doc = NewDocument {
            name: candidate.name.to_string(),
            location: stored.location,
            size: stored.size,
            content_type: candidate.media_type(),
            checksum: stored.checksum,
            created_at: Utc::now(),
        };

        match self.index.insert(new_doc).await {
            Ok(document) => {
                info!(
                    document_id = document.id,
                    size = document.size,
                    "Document committed"
                );
                Ok(document)
            }
            Err(e) => {
                error!(error = %e, location = %stored.location, "Index insert failed after blob write");
                self.remove_orphan(&stored.location).await;
                Err(DocumentError::Index(e))
            }
        }
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, DocumentError> {
        self.index.list().await.map_err(DocumentError::Index)
    }

    /// Open a document for reading.
    #[instrument(skip(self))]
    pub async fn fetch_document(&self, id: i32) -> Result<FetchedDocument, DocumentError> {
        let document = self.lookup(id).await?;

        let actual = match self.blobs.size(&document.location).await {
            Ok(actual) => actual,
            Err(e) if e.is_not_found() => return Err(content_missing(&document)),
            Err(e) => return Err(DocumentError::Blob(e)),
        };

        if actual != document.size {
            error!(
                document_id = id,
                expected = document.size,
                actual,
                "Stored size disagrees with index"
            );
            return Err(DocumentError::Corrupted {
                id,
                expected: document.size,
                actual,
            });
        }

        let reader = match self.blobs.get_stream(&document.location).await {
            Ok(reader) => reader,
            Err(e) if e.is_not_found() => return Err(content_missing(&document)),
            Err(e) => return Err(DocumentError::Blob(e)),
        };

        Ok(FetchedDocument { document, reader })
    }

    /// Remove a document's content, then its descriptor.
    #[instrument(skip(self))]
    pub async fn remove_document(&self, id: i32) -> Result<(), DocumentError> {
        let document = self.lookup(id).await?;

        let deleted = self
            .blobs
            .delete(&document.location)
            .await
            .map_err(DocumentError::Blob)?;
        if !deleted {
            warn!(document_id = id, location = %document.location, "Blob was already gone");
        }

        let removed = self
            .index
            .delete(id)
            .await
            .map_err(DocumentError::Index)?;
        if removed == 0 {
            debug!(document_id = id, "Row removed by a concurrent delete");
        }

        info!(document_id = id, "Document removed");
        Ok(())
    }

    async fn lookup(&self, id: i32) -> Result<Document, DocumentError> {
        self.index
            .get(id)
            .await
            .map_err(DocumentError::Index)?
            .ok_or(DocumentError::NotFound(id))
    }

    /// Compensating delete for a blob that never got a row.
    async fn remove_orphan(&self, location: &BlobLocation) {
        match self.blobs.delete(location).await {
            Ok(_) => debug!(%location, "Removed unindexed blob"),
            Err(source) => {
                let failure = OrphanCleanupFailure {
                    location: *location,
                    source,
                };
                error!(error = %failure, %location, "Orphaned blob left for sweep");
            }
        }
    }
}

fn content_missing(document: &Document) -> DocumentError {
    warn!(
        document_id = document.id,
        location = %document.location,
        "Indexed document has no content"
    );
    DocumentError::ContentMissing {
        id: document.id,
        location: document.location,
    }
}
