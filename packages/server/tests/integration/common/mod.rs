use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use ::common::storage::BlobLocation;
use ::common::storage::filesystem::FilesystemBlobStore;
use server::config::{
    AppConfig, CorsConfig, DatabaseConfig, ServerConfig, SweepConfig, UploadConfig,
};
use server::documents::{DocumentCoordinator, IngressValidator, SeaOrmIndex};
use server::state::AppState;

/// Upload ceiling used by every test server.
pub const MAX_SIZE: u64 = 4096;

pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const DOCUMENTS: &str = "/api/v1/documents";
    pub const UPLOAD: &str = "/api/v1/documents/upload";

    pub fn document(id: i32) -> String {
        format!("/api/v1/documents/{id}")
    }
}

/// A running test server backed by a throwaway SQLite file and blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub blobs: Arc<FilesystemBlobStore>,
    pub documents: DocumentCoordinator,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig {
                url: format!(
                    "sqlite://{}?mode=rwc",
                    dir.path().join("portal.sqlite").display()
                ),
                max_connections: 1,
            },
            storage: ::common::StorageConfig {
                blob_dir: dir.path().join("blobs"),
            },
            upload: UploadConfig {
                max_size: MAX_SIZE,
                ..Default::default()
            },
            sweep: SweepConfig {
                interval_secs: 0,
                ..Default::default()
            },
        };

        let db = server::database::init_db(&app_config.database)
            .await
            .expect("Failed to initialize test database");
        let blobs = Arc::new(
            FilesystemBlobStore::new(app_config.storage.blob_dir.clone(), MAX_SIZE)
                .await
                .expect("Failed to create blob store"),
        );

        let documents = DocumentCoordinator::new(
            blobs.clone(),
            Arc::new(SeaOrmIndex::new(db)),
            Arc::new(IngressValidator::from_config(&app_config.upload)),
        );

        let state = AppState {
            documents: documents.clone(),
            config: app_config,
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            blobs,
            documents,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_if_none_match(&self, path: &str, etag: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("If-None-Match", etag)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// POST a hand-built body with the given `Content-Type`.
    pub async fn post_raw(&self, path: &str, content_type: &str, body: Vec<u8>) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .expect("Failed to send raw POST request");

        TestResponse::from_response(res).await
    }

    /// Upload a file in the `file` field with an explicit content type.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>, mime: &str) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_form(routes::UPLOAD, form).await
    }

    /// Upload a PDF and return its `id`.
    pub async fn upload_pdf(&self, file_name: &str, bytes: &[u8]) -> i32 {
        let res = self
            .upload(file_name, bytes.to_vec(), "application/pdf")
            .await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text());
        res.id()
    }

    /// Storage location of an indexed document.
    pub async fn location_of(&self, id: i32) -> BlobLocation {
        self.documents
            .list_documents()
            .await
            .expect("Failed to list documents")
            .into_iter()
            .find(|d| d.id == id)
            .expect("document should be indexed")
            .location
    }

    /// Filesystem path of an indexed document's content.
    pub async fn blob_path(&self, id: i32) -> std::path::PathBuf {
        self.blobs.blob_path(&self.location_of(id).await)
    }

    /// Number of committed blobs.
    pub async fn blob_count(&self) -> usize {
        use ::common::storage::BlobStore;
        self.blobs.list().await.expect("Failed to list blobs").len()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
