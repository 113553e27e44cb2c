use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;

use crate::documents::UploadCandidate;
use crate::error::{AppError, ErrorBody};
use crate::models::document::{DocumentListResponse, DocumentResponse};
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn document_upload_body_limit(max_size: u64) -> DefaultBodyLimit {
    let max_file = usize::try_from(max_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max_file.saturating_add(MULTIPART_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/documents/upload",
    tag = "Documents",
    operation_id = "uploadDocument",
    summary = "Upload a document",
    description = "Uploads a PDF document. The `file` multipart field is required; its filename \
        becomes the document name and its content type is checked against the allow-list. \
        Other fields are ignored.",
    request_body(content_type = "multipart/form-data", description = "PDF file upload"),
    responses(
        (status = 201, description = "Document stored", body = DocumentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;

        let declared_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(&name)
                .first_or_octet_stream()
                .to_string(),
        };

        let candidate = UploadCandidate {
            name: &name,
            declared_type: &declared_type,
            declared_size: None,
        };

        let mut reader = StreamReader::new(Box::pin(field.map_err(std::io::Error::other)));
        let document = state
            .documents
            .submit_upload(candidate, &mut reader)
            .await?;

        return Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))));
    }

    Err(AppError::Validation("No file provided".into()))
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "Documents",
    operation_id = "listDocuments",
    summary = "List documents",
    description = "Returns every stored document, newest first. Documents uploaded in the same \
        instant are ordered by descending id.",
    responses(
        (status = 200, description = "Document list", body = DocumentListResponse),
        (status = 500, description = "Index failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.documents.list_documents().await?;

    let total = documents.len() as u64;
    let documents = documents.into_iter().map(DocumentResponse::from).collect();

    Ok(Json(DocumentListResponse { documents, total }))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "Documents",
    operation_id = "downloadDocument",
    summary = "Download a document",
    description = "Streams the document content as an attachment. Supports ETag-based caching \
        via If-None-Match. A document whose content has disappeared from storage answers 410.",
    params(("id" = i32, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Invalid document ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
        (status = 410, description = "Content missing from storage (CONTENT_MISSING)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_document_id(&id)?;
    let fetched = state.documents.fetch_document(id).await?;
    let document = &fetched.document;

    let etag_value = format!("\"{}\"", document.checksum);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let content_type = document.content_type.clone();
    let content_length = document.size.to_string();
    let disposition = content_disposition_value("attachment", &document.name);

    let body = Body::from_stream(ReaderStream::new(fetched.reader));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, no-cache")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Delete a document",
    description = "Removes the document content and then its metadata. Deleting an unknown or \
        already-deleted document answers 404.",
    params(("id" = i32, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 400, description = "Invalid document ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_document_id(&id)?;
    state.documents.remove_document(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_document_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation("Invalid document ID".into()))
}
