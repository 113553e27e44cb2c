use std::io::Cursor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::location::BlobLocation;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub location: BlobLocation,
    /// Number of bytes written.
    pub size: u64,
    /// SHA-256 of the content, lowercase hex.
    pub checksum: String,
}

/// A blob as seen by a listing.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub location: BlobLocation,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Location-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at a freshly allocated location.
    async fn put(&self, data: &[u8]) -> Result<StoredBlob, StorageError> {
        let mut reader = Cursor::new(data);
        self.put_stream(&mut reader).await
    }

    /// Store data from an async reader at a freshly allocated location.
    ///
    /// The blob only becomes visible once it has been fully written; a failed
    /// write leaves nothing behind.
    async fn put_stream(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredBlob, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, location: &BlobLocation) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(location).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, location: &BlobLocation) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, location: &BlobLocation) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, location: &BlobLocation) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, location: &BlobLocation) -> Result<u64, StorageError>;

    /// List every committed blob. In-progress writes are not included.
    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError>;
}
