use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::warn;

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::{BlobEntry, BlobStore, BoxReader, validate_expiry};
use crate::config::StorageConfig;

/// S3-compatible blob store (AWS S3, MinIO, Cloudflare R2, ...).
///
/// Objects are written with the bucket's default (private) ACL; read access
/// for clients goes through presigned GET URLs.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    bucket_name: String,
    max_size: u64,
}

impl S3BlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.region.parse::<Region>().map_err(|e| {
                StorageError::Unavailable(format!("invalid region {:?}: {e}", config.region))
            })?,
        };

        let credentials = Credentials::new(
            non_empty(&config.access_key),
            non_empty(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Unavailable(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Unavailable(format!("failed to open bucket: {e}")))?;
        if config.endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            bucket_name: config.bucket.clone(),
            max_size: config.max_blob_size,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn put_stream(
        &self,
        key: &BlobKey,
        reader: BoxReader,
        content_type: &str,
    ) -> Result<u64, StorageError> {
        // One byte past the limit is enough to detect an oversized upload.
        let mut limited = reader.take(self.max_size.saturating_add(1));

        let response = self
            .bucket
            .put_object_stream_with_content_type(&mut limited, key.as_str(), content_type)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{key}: {e}")))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::WriteFailed(format!(
                "{key}: S3 returned status {status}"
            )));
        }

        let written = response.uploaded_bytes() as u64;
        if written > self.max_size {
            if let Err(e) = self.bucket.delete_object(key.as_str()).await {
                warn!(key = %key, error = %e, "Failed to remove oversized object");
            }
            return Err(StorageError::SizeLimitExceeded {
                actual: written,
                limit: self.max_size,
            });
        }

        Ok(written)
    }

    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError> {
        let response = match self.bucket.get_object_stream(key.as_str()).await {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) => return Err(StorageError::ReadFailed(format!("{key}: {e}"))),
        };

        match response.status_code {
            404 => return Err(StorageError::NotFound(key.to_string())),
            status if !(200..300).contains(&status) => {
                return Err(StorageError::ReadFailed(format!(
                    "{key}: S3 returned status {status}"
                )));
            }
            _ => {}
        }

        let stream = response.bytes.map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn presigned_get_url(
        &self,
        key: &BlobKey,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        validate_expiry(expires_in)?;
        let expiry_secs = u32::try_from(expires_in.as_secs()).unwrap_or(u32::MAX);

        self.bucket
            .presign_get(key.as_str(), expiry_secs, None)
            .await
            .map_err(|e| StorageError::Presign(format!("{key}: {e}")))
    }

    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError> {
        match self.bucket.head_object(key.as_str()).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) if (200..300).contains(&status) => Ok(true),
            Ok((_, status)) => Err(StorageError::ReadFailed(format!(
                "{key}: S3 returned status {status}"
            ))),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::ReadFailed(format!("{key}: {e}"))),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError> {
        match self.bucket.delete_object(key.as_str()).await {
            Ok(response) => match response.status_code() {
                404 => Ok(false),
                status if (200..300).contains(&status) => Ok(true),
                status => Err(StorageError::WriteFailed(format!(
                    "delete {key}: S3 returned status {status}"
                ))),
            },
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::WriteFailed(format!("delete {key}: {e}"))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| StorageError::ReadFailed(format!("list {prefix}: {e}")))?;

        let mut entries = Vec::new();
        for object in pages.into_iter().flat_map(|page| page.contents) {
            let Ok(key) = BlobKey::parse(object.key.clone()) else {
                warn!(key = %object.key, "Skipping object with unsupported key");
                continue;
            };
            // An unparseable timestamp counts as "just written" so the sweep leaves it alone.
            let last_modified = DateTime::parse_from_rfc3339(&object.last_modified)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.push(BlobEntry {
                key,
                size: object.size,
                last_modified,
            });
        }

        Ok(entries)
    }
}
