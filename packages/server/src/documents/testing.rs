//! Fixtures and fault-injecting stores for the document tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::{BlobEntry, BlobLocation, BlobStore, BoxReader, StorageError, StoredBlob};
use sea_orm::DbErr;
use tokio::io::AsyncRead;

use super::{
    Document, DocumentCoordinator, IngressValidator, MetadataIndex, NewDocument, SeaOrmIndex,
};
use crate::config::{DatabaseConfig, UploadConfig};
use crate::database::init_db;

pub const TEST_MAX_SIZE: u64 = 1024;

pub async fn sqlite_index() -> (SeaOrmIndex, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("index.sqlite").display()
        ),
        max_connections: 1,
    };
    let db = init_db(&config).await.unwrap();
    (SeaOrmIndex::new(db), dir)
}

/// Index that can be told to fail inserts.
pub struct FaultyIndex {
    pub inner: SeaOrmIndex,
    pub fail_inserts: AtomicBool,
}

#[async_trait]
impl MetadataIndex for FaultyIndex {
    async fn insert(&self, doc: NewDocument) -> Result<Document, DbErr> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("injected insert failure".into()));
        }
        self.inner.insert(doc).await
    }

    async fn list(&self) -> Result<Vec<Document>, DbErr> {
        self.inner.list().await
    }

    async fn get(&self, id: i32) -> Result<Option<Document>, DbErr> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        self.inner.delete(id).await
    }
}

/// Blob store that can be told to fail deletes.
pub struct FaultyBlobStore {
    pub inner: FilesystemBlobStore,
    pub fail_deletes: AtomicBool,
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put_stream(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredBlob, StorageError> {
        self.inner.put_stream(reader).await
    }

    async fn get_stream(&self, location: &BlobLocation) -> Result<BoxReader, StorageError> {
        self.inner.get_stream(location).await
    }

    async fn exists(&self, location: &BlobLocation) -> Result<bool, StorageError> {
        self.inner.exists(location).await
    }

    async fn delete(&self, location: &BlobLocation) -> Result<bool, StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other(
                "injected delete failure",
            )));
        }
        self.inner.delete(location).await
    }

    async fn size(&self, location: &BlobLocation) -> Result<u64, StorageError> {
        self.inner.size(location).await
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError> {
        self.inner.list().await
    }
}

/// A coordinator wired to fault-injecting stores, plus handles to them.
pub struct Harness {
    pub coordinator: DocumentCoordinator,
    pub blobs: Arc<FaultyBlobStore>,
    pub index: Arc<FaultyIndex>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let (inner_index, dir) = sqlite_index().await;
        let inner_blobs = FilesystemBlobStore::new(dir.path().join("blobs"), TEST_MAX_SIZE)
            .await
            .unwrap();

        let blobs = Arc::new(FaultyBlobStore {
            inner: inner_blobs,
            fail_deletes: AtomicBool::new(false),
        });
        let index = Arc::new(FaultyIndex {
            inner: inner_index,
            fail_inserts: AtomicBool::new(false),
        });
        let validator = IngressValidator::from_config(&UploadConfig {
            max_size: TEST_MAX_SIZE,
            ..Default::default()
        });

        let coordinator =
            DocumentCoordinator::new(blobs.clone(), index.clone(), Arc::new(validator));

        Self {
            coordinator,
            blobs,
            index,
            dir,
        }
    }

    /// Number of committed blobs plus leftover temp files.
    pub async fn blob_files(&self) -> usize {
        let committed = self.blobs.list().await.unwrap().len();
        let temp = std::fs::read_dir(self.dir.path().join("blobs/.tmp"))
            .unwrap()
            .count();
        committed + temp
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.index.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.blobs.fail_deletes.store(fail, Ordering::SeqCst);
    }
}
