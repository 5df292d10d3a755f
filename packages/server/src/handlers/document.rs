use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::storage::BoxReader;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::documents::{DocumentDownload, UploadRequest};
use crate::error::{AppError, ErrorBody};
use crate::extractors::query::AppQuery;
use crate::models::document::{DocumentResponse, DownloadUrlQuery, DownloadUrlResponse};
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the blob size limit.
const MULTIPART_SLACK: u64 = 1024 * 1024;

pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_add(MULTIPART_SLACK);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Documents",
    operation_id = "uploadDocument",
    summary = "Upload a document",
    description = "Stores the `file` part in the blob store and creates its metadata record. \
        Optional parts: `description`, `tags` (comma-separated) and `metadata` (JSON object of \
        string values; malformed JSON is stored as an empty object).",
    request_body(content_type = "multipart/form-data", description = "File with optional descriptive fields"),
    responses(
        (status = 201, description = "Document created", body = DocumentResponse,
            headers(("Location" = String, description = "URL of the new document"))),
        (status = 400, description = "Missing or empty file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.storage.max_blob_size;
    let mut upload: Option<SpooledUpload> = None;
    let mut request = UploadRequest::default();

    let result = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            match field.name() {
                Some("file") => {
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    request.file_name = file_name;
                    request.content_type = field.content_type().map(str::to_string);
                    if let Some(previous) = upload.take() {
                        previous.remove().await;
                    }
                    upload = Some(spool_field(field, max_size).await?);
                }
                Some("description") => request.description = Some(field_text(field).await?),
                Some("tags") => request.tags = Some(field_text(field).await?),
                Some("metadata") => request.metadata = Some(field_text(field).await?),
                _ => {} // Ignore unknown fields.
            }
        }

        let Some(spooled) = &upload else {
            return Err(AppError::Validation("No file uploaded".into()));
        };

        let reader = spooled.open().await?;
        let record = state
            .documents
            .upload(reader, spooled.size, std::mem::take(&mut request))
            .await?;
        Ok(record)
    }
    .await;

    if let Some(spooled) = upload {
        spooled.remove().await;
    }

    let record = result?;
    let location = format!("/api/documents/{}", record.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(DocumentResponse::from(record)),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Documents",
    operation_id = "getDocument",
    summary = "Get document metadata",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let record = state.documents.get(&id).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Documents",
    operation_id = "downloadDocument",
    summary = "Download document content",
    description = "Streams the stored blob with its recorded content type, as an attachment.",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document content"),
        (status = 404, description = "Document or blob not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let download = state.documents.download(&id).await?;
    build_blob_response(download)
}

#[utoipa::path(
    get,
    path = "/{id}/download-url",
    tag = "Documents",
    operation_id = "getDownloadUrl",
    summary = "Create a presigned download URL",
    params(
        ("id" = String, Path, description = "Document ID"),
        DownloadUrlQuery,
    ),
    responses(
        (status = 200, description = "Presigned URL", body = DownloadUrlResponse),
        (status = 400, description = "expirationMinutes out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_download_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponse>, AppError> {
    let link = state
        .documents
        .download_url(&id, query.expiration_minutes)
        .await?;
    Ok(Json(link.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Delete a document",
    description = "Removes the blob and the metadata record.",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.documents.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Document not found".into()))
    }
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}

/// Upload content buffered in a temp file so its size is known before the blob write.
struct SpooledUpload {
    path: std::path::PathBuf,
    size: u64,
}

impl SpooledUpload {
    async fn open(&self) -> Result<BoxReader, AppError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        Ok(Box::new(file))
    }

    async fn remove(self) {
        // Best effort.
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}

/// Stream a multipart field to a temp file.
async fn spool_field(
    mut field: axum::extract::multipart::Field<'_>,
    max_size: u64,
) -> Result<SpooledUpload, AppError> {
    let path = std::env::temp_dir().join(format!("docstore-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;

        Ok(total_size)
    }
    .await;

    match result {
        Ok(size) => Ok(SpooledUpload { path, size }),
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}

/// Build a streaming response for a downloaded blob.
fn build_blob_response(download: DocumentDownload) -> Result<Response, AppError> {
    let body = Body::from_stream(ReaderStream::new(download.content));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.content_type)
        .header(header::CONTENT_LENGTH, download.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&download.file_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a safe `attachment` Content-Disposition header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_safe = ascii_safe.trim();
    let ascii_name = if ascii_safe.is_empty() {
        "download"
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
