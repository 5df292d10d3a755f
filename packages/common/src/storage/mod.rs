mod error;
mod key;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

pub use error::StorageError;
pub use key::{BlobKey, DOCUMENT_PREFIX};
pub use traits::{BlobEntry, BlobStore, BoxReader, MAX_PRESIGN_EXPIRY, validate_expiry};

use crate::config::{StorageBackend, StorageConfig};
use filesystem::FilesystemBlobStore;

/// Open the blob store selected by `config`.
pub async fn open_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => Ok(Arc::new(
            FilesystemBlobStore::new(
                config.filesystem_path.clone(),
                config.bucket.clone(),
                config.max_blob_size,
            )
            .await?,
        )),
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => Ok(Arc::new(self::s3::S3BlobStore::new(config)?)),
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Unavailable(
            "the S3 backend requires the `object-storage` feature".into(),
        )),
    }
}
