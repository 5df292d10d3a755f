use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::{DEFAULT_URL_TTL_MINUTES, DocumentRecord, DownloadUrl};

/// Response DTO for a single document.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    /// Document ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "invoice-2024-03.pdf")]
    pub file_name: String,
    /// Filename as supplied by the uploader.
    #[schema(example = "invoice-2024-03.pdf")]
    pub original_file_name: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Blob size in bytes.
    #[schema(example = 142857)]
    pub file_size: u64,
    /// Object key in the blob store.
    #[schema(example = "documents/6f1c2a9e-0d7b-4a57-9a53-5b0b8c1d2e3f/invoice-2024-03.pdf")]
    pub blob_key: String,
    #[schema(example = "documents")]
    pub blob_bucket: String,
    pub uploaded_at: DateTime<Utc>,
    #[schema(example = json!(["finance", "2024"]))]
    pub tags: Vec<String>,
    #[schema(example = json!({"department": "accounting"}))]
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            original_file_name: record.original_file_name,
            content_type: record.content_type,
            file_size: record.file_size,
            blob_key: record.blob_key,
            blob_bucket: record.blob_bucket,
            uploaded_at: record.uploaded_at,
            tags: record.tags,
            metadata: record.metadata,
            description: record.description,
        }
    }
}

/// A time-limited direct download link.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    /// Presigned URL.
    pub url: String,
    /// Link lifetime in minutes.
    #[schema(example = 60)]
    pub expires_in: u32,
}

impl From<DownloadUrl> for DownloadUrlResponse {
    fn from(link: DownloadUrl) -> Self {
        Self {
            url: link.url,
            expires_in: link.expires_in_minutes,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DownloadUrlQuery {
    /// Link lifetime in minutes (1-10080, default 60).
    #[param(minimum = 1, maximum = 10080, example = 60)]
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: u32,
}

fn default_expiration_minutes() -> u32 {
    DEFAULT_URL_TTL_MINUTES
}
