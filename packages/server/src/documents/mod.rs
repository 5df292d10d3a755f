//! Document lifecycle: upload, read, update, delete and search, keeping the
//! blob store and the metadata store consistent.

mod error;
mod parse;
mod record;
mod service;
pub mod sweep;

pub use error::DocumentError;
pub use parse::{parse_metadata, parse_tags};
pub use record::{
    DocumentDownload, DocumentRecord, DocumentUpdate, DownloadUrl, NewDocument, SearchFilter,
};
pub use service::{
    DEFAULT_URL_TTL_MINUTES, DocumentService, MAX_URL_TTL_MINUTES, UploadRequest,
};
