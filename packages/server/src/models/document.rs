use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::documents::Document;

/// Response DTO for a single document.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    #[schema(example = 1)]
    pub id: i32,
    /// Original upload filename.
    #[schema(example = "lab-results.pdf")]
    pub name: String,
    /// Content size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// SHA-256 of the content, lowercase hex.
    #[schema(example = "a1b2c3d4e5f6...")]
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Response DTO for listing documents, newest first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: u64,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            size: doc.size,
            content_type: doc.content_type,
            checksum: doc.checksum,
            created_at: doc.created_at,
        }
    }
}

/// Liveness probe response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
}
