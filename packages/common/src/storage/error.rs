use std::fmt;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The blob key is malformed or escapes the store root.
    InvalidKey(String),
    /// The blob exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The backend could not be reached or configured.
    Unavailable(String),
    /// The backend rejected or interrupted a write.
    WriteFailed(String),
    /// The backend failed while serving a read.
    ReadFailed(String),
    /// A presigned URL could not be produced.
    Presign(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "blob not found: {key}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidKey(msg) => write!(f, "invalid blob key: {msg}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "blob exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::Unavailable(msg) => write!(f, "blob store unavailable: {msg}"),
            Self::WriteFailed(msg) => write!(f, "blob write failed: {msg}"),
            Self::ReadFailed(msg) => write!(f, "blob read failed: {msg}"),
            Self::Presign(msg) => write!(f, "presigned URL generation failed: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
