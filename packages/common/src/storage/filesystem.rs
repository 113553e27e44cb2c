use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::location::BlobLocation;
use super::traits::{BlobEntry, BlobStore, BoxReader, StoredBlob};

const TMP_DIR: &str = ".tmp";

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 30 hex chars}`
///
/// Writes land in `{base_path}/.tmp` and are renamed into place once flushed
/// to disk, so readers never observe a partially written blob.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TMP_DIR)).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given location.
    pub fn blob_path(&self, location: &BlobLocation) -> PathBuf {
        self.base_path
            .join(location.shard_prefix())
            .join(location.shard_suffix())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self, location: &BlobLocation) -> PathBuf {
        self.base_path.join(TMP_DIR).join(location.as_str())
    }

    async fn write_temp(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        temp_path: &PathBuf,
    ) -> Result<(u64, String), StorageError> {
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await.map_err(StorageError::Source)?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        temp_file.sync_all().await?;

        Ok((total_bytes, hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredBlob, StorageError> {
        let location = BlobLocation::generate();
        let temp_path = self.temp_path(&location);

        let (size, checksum) = match self.write_temp(reader, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        let blob_path = self.blob_path(&location);
        if let Some(parent) = blob_path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(%location, size, "Blob written");

        Ok(StoredBlob {
            location,
            size,
            checksum,
        })
    }

    async fn get_stream(&self, location: &BlobLocation) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(location);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::with_capacity(64 * 1024, file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(*location))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, location: &BlobLocation) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(location);
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn delete(&self, location: &BlobLocation) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(location);
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, location: &BlobLocation) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(location);
        match fs::metadata(&blob_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(*location))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut shards = fs::read_dir(&self.base_path).await?;

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let prefix = shard.file_name().to_string_lossy().into_owned();
            if prefix == TMP_DIR {
                continue;
            }

            let mut files = fs::read_dir(shard.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let suffix = file.file_name().to_string_lossy().into_owned();
                let location = match BlobLocation::parse(&format!("{prefix}{suffix}")) {
                    Ok(location) => location,
                    Err(e) => {
                        debug!(path = %file.path().display(), error = %e, "Skipping foreign file");
                        continue;
                    }
                };

                // Deleted between read_dir and metadata.
                let meta = match file.metadata().await {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                };

                entries.push(BlobEntry {
                    location,
                    size: meta.len(),
                    modified_at: DateTime::<Utc>::from(meta.modified()?),
                });
            }
        }

        Ok(entries)
    }
}
