use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::key::BlobKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Maximum presigned URL lifetime (the S3 limit of 7 days).
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A blob found by [`BlobStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: BlobKey,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Key-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Logical bucket name recorded alongside each stored document.
    fn bucket(&self) -> &str;

    /// Store a new file under a freshly generated key.
    ///
    /// Returns the key and the number of bytes written.
    async fn upload(
        &self,
        reader: BoxReader,
        file_name: &str,
        content_type: &str,
    ) -> Result<(BlobKey, u64), StorageError> {
        let key = BlobKey::generate(file_name);
        let written = self.put_stream(&key, reader, content_type).await?;
        Ok((key, written))
    }

    /// Store bytes under `key`.
    async fn put(
        &self,
        key: &BlobKey,
        data: &[u8],
        content_type: &str,
    ) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(key, reader, content_type).await
    }

    /// Store data from an async reader under `key`, privately.
    ///
    /// Returns the number of bytes written.
    async fn put_stream(
        &self,
        key: &BlobKey,
        reader: BoxReader,
        content_type: &str,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    ///
    /// Returns `StorageError::NotFound` if the blob doesn't exist.
    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError>;

    /// Produce a URL granting read access for `expires_in` without further
    /// authentication. Does not check that the blob exists.
    async fn presigned_get_url(
        &self,
        key: &BlobKey,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Deleting an absent key is not an error. Returns `false` when the backend
    /// can tell the blob did not exist.
    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError>;

    /// List blobs whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError>;
}

/// Validate a presigned URL lifetime.
pub fn validate_expiry(expires_in: Duration) -> Result<(), StorageError> {
    if expires_in.is_zero() {
        Err(StorageError::Presign(
            "expiry duration must be greater than zero".into(),
        ))
    } else if expires_in > MAX_PRESIGN_EXPIRY {
        Err(StorageError::Presign(format!(
            "expiry duration {expires_in:?} exceeds maximum allowed {MAX_PRESIGN_EXPIRY:?}"
        )))
    } else {
        Ok(())
    }
}
