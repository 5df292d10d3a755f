use std::time::Duration;

use common::storage::StorageError;
use thiserror::Error;

use crate::store::MetadataError;

/// Failures of a document operation.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The record, or the blob it points at, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no file content was uploaded")]
    EmptyUpload,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Metadata(MetadataError),
}

impl From<StorageError> for DocumentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => DocumentError::NotFound(format!("blob {key}")),
            other => DocumentError::Storage(other),
        }
    }
}

impl From<MetadataError> for DocumentError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(id) => DocumentError::NotFound(format!("document {id}")),
            other => DocumentError::Metadata(other),
        }
    }
}
