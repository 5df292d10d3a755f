use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::storage::{BlobKey, BlobStore, BoxReader, DOCUMENT_PREFIX, StorageError};
use tracing::{error, info, instrument, warn};

use super::error::DocumentError;
use super::parse::{parse_metadata, parse_tags};
use super::record::{
    DocumentDownload, DocumentRecord, DocumentUpdate, DownloadUrl, NewDocument, SearchFilter,
};
use crate::config::{CompensationPolicy, ConsistencyConfig};
use crate::store::MetadataStore;

/// Download links live for an hour unless the caller asks otherwise.
pub const DEFAULT_URL_TTL_MINUTES: u32 = 60;
/// Seven days, the longest lifetime S3 accepts for a presigned URL.
pub const MAX_URL_TTL_MINUTES: u32 = 7 * 24 * 60;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Raw upload form values.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: String,
    /// Declared by the client; guessed from `file_name` when absent.
    pub content_type: Option<String>,
    pub description: Option<String>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    /// JSON object of string values.
    pub metadata: Option<String>,
}

/// Coordinates the blob store and the metadata store.
///
/// Every record points at exactly one blob. Uploads write the blob first and
/// the record second; deletes remove the blob first and the record second.
/// The [`ConsistencyConfig`] policies decide what happens when the second
/// step fails.
pub struct DocumentService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    consistency: ConsistencyConfig,
}

impl DocumentService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        consistency: ConsistencyConfig,
    ) -> Self {
        Self {
            blobs,
            metadata,
            consistency,
        }
    }

    /// Run one store call under the configured deadline.
    async fn bounded<T, E, F>(&self, operation: &'static str, call: F) -> Result<T, DocumentError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DocumentError>,
    {
        self.bounded_by(self.consistency.operation_timeout(), operation, call)
            .await
    }

    async fn bounded_by<T, E, F>(
        &self,
        after: Duration,
        operation: &'static str,
        call: F,
    ) -> Result<T, DocumentError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DocumentError>,
    {
        match tokio::time::timeout(after, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(operation, ?after, "Store call timed out");
                Err(DocumentError::Timeout { operation, after })
            }
        }
    }

    /// Best-effort blob removal; failures are logged for the orphan sweep.
    async fn discard_blob(&self, key: &BlobKey, reason: &str) {
        match self.bounded("blob delete", self.blobs.delete(key)).await {
            Ok(_) => info!(blob_key = %key, reason, "Removed blob"),
            Err(e) => warn!(blob_key = %key, reason, error = %e, "Failed to remove blob"),
        }
    }

    /// Store `content` and create its record.
    ///
    /// `size` is the number of bytes the caller received; a blob store that
    /// accepts fewer bytes fails the upload.
    #[instrument(skip(self, content, request), fields(file_name = %request.file_name))]
    pub async fn upload(
        &self,
        content: BoxReader,
        size: u64,
        request: UploadRequest,
    ) -> Result<DocumentRecord, DocumentError> {
        if size == 0 {
            return Err(DocumentError::EmptyUpload);
        }
        if request.file_name.trim().is_empty() {
            return Err(DocumentError::InvalidInput("file name is required".into()));
        }

        let content_type = resolve_content_type(&request.file_name, request.content_type.as_deref());

        let (key, written) = self
            .bounded_by(
                self.consistency.transfer_timeout(),
                "blob upload",
                self.blobs.upload(content, &request.file_name, &content_type),
            )
            .await?;

        if written != size {
            self.discard_blob(&key, "short write").await;
            return Err(StorageError::WriteFailed(format!(
                "{key}: expected {size} bytes, stored {written}"
            ))
            .into());
        }

        let document = NewDocument {
            file_name: request.file_name.clone(),
            original_file_name: request.file_name,
            content_type,
            file_size: written,
            blob_key: key.to_string(),
            blob_bucket: self.blobs.bucket().to_string(),
            uploaded_at: Utc::now(),
            tags: parse_tags(request.tags.as_deref()),
            metadata: parse_metadata(request.metadata.as_deref()),
            description: request.description.filter(|d| !d.is_empty()),
        };

        match self
            .bounded("metadata insert", self.metadata.insert(document))
            .await
        {
            Ok(record) => {
                info!(id = %record.id, blob_key = %key, size = written, "Document uploaded");
                Ok(record)
            }
            Err(e) => {
                match self.consistency.upload_compensation {
                    CompensationPolicy::Compensate => {
                        self.discard_blob(&key, "metadata insert failed").await;
                    }
                    CompensationPolicy::FailFast => {
                        warn!(blob_key = %key, "Metadata insert failed, blob left in place");
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<DocumentRecord, DocumentError> {
        self.bounded("metadata read", self.metadata.get_by_id(id))
            .await?
            .ok_or_else(|| DocumentError::NotFound(format!("document {id}")))
    }

    /// Like [`get`](Self::get) but absence is `None`.
    pub async fn find(&self, id: &str) -> Result<Option<DocumentRecord>, DocumentError> {
        self.bounded("metadata read", self.metadata.get_by_id(id))
            .await
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>, DocumentError> {
        self.bounded("metadata list", self.metadata.list()).await
    }

    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<DocumentRecord>, DocumentError> {
        self.bounded("metadata search", self.metadata.search(filter))
            .await
    }

    /// Open the blob behind document `id` for streaming.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &str) -> Result<DocumentDownload, DocumentError> {
        let record = self.get(id).await?;
        let key = BlobKey::parse(record.blob_key.clone())?;
        let content = self
            .bounded("blob read", self.blobs.get_stream(&key))
            .await?;

        Ok(DocumentDownload {
            content,
            content_type: record.content_type,
            file_name: record.original_file_name,
            size: record.file_size,
        })
    }

    /// Issue a time-limited direct link to the blob behind document `id`.
    #[instrument(skip(self))]
    pub async fn download_url(
        &self,
        id: &str,
        ttl_minutes: u32,
    ) -> Result<DownloadUrl, DocumentError> {
        if !(1..=MAX_URL_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(DocumentError::InvalidInput(format!(
                "expirationMinutes must be between 1 and {MAX_URL_TTL_MINUTES}"
            )));
        }

        let record = self.get(id).await?;
        let key = BlobKey::parse(record.blob_key)?;
        let expires_in = Duration::from_secs(u64::from(ttl_minutes) * 60);
        let url = self
            .bounded("blob presign", self.blobs.presigned_get_url(&key, expires_in))
            .await?;

        Ok(DownloadUrl {
            url,
            expires_in_minutes: ttl_minutes,
        })
    }

    /// Apply a partial update. Only present fields change.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<DocumentRecord, DocumentError> {
        let mut record = self.get(id).await?;
        if !update.apply(&mut record) {
            return Ok(record);
        }

        self.bounded("metadata replace", self.metadata.replace(id, &record))
            .await?;
        info!(id, "Document updated");
        Ok(record)
    }

    /// Remove document `id` and its blob. Returns `false` if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool, DocumentError> {
        let Some(record) = self.find(id).await? else {
            return Ok(false);
        };

        let removed_blob = match BlobKey::parse(record.blob_key.clone()) {
            Ok(key) => self.bounded("blob delete", self.blobs.delete(&key)).await,
            Err(e) => Err(e.into()),
        };

        match removed_blob {
            Ok(false) => warn!(id, blob_key = %record.blob_key, "Blob was already gone"),
            Ok(true) => {}
            Err(e) => match self.consistency.delete_compensation {
                CompensationPolicy::FailFast => {
                    error!(id, blob_key = %record.blob_key, error = %e, "Blob delete failed, keeping record");
                    return Err(e);
                }
                CompensationPolicy::Compensate => {
                    warn!(
                        id,
                        blob_key = %record.blob_key,
                        error = %e,
                        "Blob delete failed, removing record anyway"
                    );
                }
            },
        }

        let removed = self
            .bounded("metadata delete", self.metadata.delete(id))
            .await?;
        if removed {
            info!(id, "Document deleted");
        }
        Ok(removed)
    }

    /// Delete blobs under the document prefix that no record references and
    /// that are older than `grace`. Returns the number of blobs removed.
    #[instrument(skip(self))]
    pub async fn sweep_orphans(&self, grace: Duration) -> Result<usize, DocumentError> {
        let prefix = format!("{DOCUMENT_PREFIX}/");
        let entries = self.bounded("blob list", self.blobs.list(&prefix)).await?;

        let Some(cutoff) = sweep_cutoff(Utc::now(), grace) else {
            return Ok(0);
        };
        let candidates: Vec<String> = entries
            .into_iter()
            .filter(|e| e.last_modified < cutoff)
            .map(|e| e.key.into_string())
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        let referenced = self
            .bounded(
                "metadata blob lookup",
                self.metadata.referenced_blob_keys(&candidates),
            )
            .await?;

        let mut removed = 0;
        for candidate in candidates.iter().filter(|k| !referenced.contains(*k)) {
            let key = BlobKey::parse(candidate.clone())?;
            match self.bounded("blob delete", self.blobs.delete(&key)).await {
                Ok(true) => {
                    info!(blob_key = %key, "Removed orphaned blob");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!(blob_key = %key, error = %e, "Failed to remove orphaned blob"),
            }
        }

        Ok(removed)
    }
}

/// Blobs last modified before the returned instant are old enough to sweep.
/// `None` when the grace period reaches past the earliest representable time.
fn sweep_cutoff(now: DateTime<Utc>, grace: Duration) -> Option<DateTime<Utc>> {
    let grace = chrono::Duration::from_std(grace).ok()?;
    now.checked_sub_signed(grace)
}

/// The declared content type, else one guessed from the file extension.
fn resolve_content_type(file_name: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared.map(str::trim).filter(|c| !c.is_empty()) {
        return declared.to_string();
    }
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}
