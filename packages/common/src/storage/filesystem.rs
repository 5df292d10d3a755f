use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::{BlobEntry, BlobStore, BoxReader, validate_expiry};

const TMP_DIR: &str = ".tmp";

/// Filesystem-backed blob store.
///
/// A key `documents/<uuid>/<name>` is stored at `{base_path}/documents/<uuid>/<name>`.
/// Writes go to `{base_path}/.tmp` first and are renamed into place, so a reader
/// never observes a partially written blob.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    bucket: String,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at `base_path`.
    pub async fn new(
        base_path: PathBuf,
        bucket: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TMP_DIR)).await?;
        let base_path = fs::canonicalize(&base_path).await?;
        Ok(Self {
            base_path,
            bucket: bucket.into(),
            max_size,
        })
    }

    /// Compute the filesystem path for a key.
    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        key.segments()
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Convert a path under the root back into a key.
    fn key_for(&self, path: &Path) -> Option<BlobKey> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        BlobKey::parse(segments?.join("/")).ok()
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_stream(
        &self,
        key: &BlobKey,
        mut reader: BoxReader,
        _content_type: &str,
    ) -> Result<u64, StorageError> {
        let temp_path = self.temp_path();
        let mut temp_file = fs::File::create(&temp_path).await?;

        let copied = copy_limited(&mut reader, &mut temp_file, self.max_size).await;
        drop(temp_file);
        let total_bytes = match copied {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        let blob_path = self.blob_path(key);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(total_bytes)
    }

    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(key);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(e.to_string())),
        }
    }

    async fn presigned_get_url(
        &self,
        key: &BlobKey,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        validate_expiry(expires_in)?;
        // Shared-filesystem assumption: the path itself is the grant.
        Ok(format!("file://{}", self.blob_path(key).display()))
    }

    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(key)).await?)
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(key);
        match fs::remove_file(&blob_path).await {
            Ok(()) => {
                // Drop the now-empty `<uuid>` directory.
                if let Some(parent) = blob_path.parent() {
                    let _ = fs::remove_dir(parent).await;
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if dir == self.base_path && entry.file_name() == TMP_DIR {
                        continue;
                    }
                    pending.push(path);
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.as_str().starts_with(prefix) {
                    continue;
                }

                let meta = entry.metadata().await?;
                let last_modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                entries.push(BlobEntry {
                    key,
                    size: meta.len(),
                    last_modified,
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Copy `reader` into `writer`, failing once more than `max_size` bytes arrive.
async fn copy_limited<R, W>(
    reader: &mut R,
    writer: &mut W,
    max_size: u64,
) -> Result<u64, StorageError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut total_bytes: u64 = 0;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "source stream interrupted after {total_bytes} bytes: {e}"
            ))
        })?;
        if n == 0 {
            break;
        }

        total_bytes += n as u64;
        if total_bytes > max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: total_bytes,
                limit: max_size,
            });
        }

        writer.write_all(&buf[..n]).await.map_err(|e| {
            StorageError::WriteFailed(format!("write failed after {total_bytes} bytes: {e}"))
        })?;
    }

    writer
        .flush()
        .await
        .map_err(|e| StorageError::WriteFailed(format!("flush failed: {e}")))?;
    Ok(total_bytes)
}
