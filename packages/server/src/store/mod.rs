//! Metadata persistence for document records.

mod memory;
mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::config::{MetadataBackend, MetadataConfig};
use crate::database;
use crate::documents::{DocumentRecord, NewDocument, SearchFilter};

pub use memory::MemoryMetadataStore;
pub use postgres::PostgresMetadataStore;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("metadata store unavailable: {0}")]
    Unavailable(#[from] DbErr),

    #[error("stored document {id} is malformed: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Durable home of document records.
///
/// Ids are opaque strings assigned by the store on insert. An id that the
/// store could never have produced is simply "not found".
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    async fn insert(&self, document: NewDocument) -> Result<DocumentRecord, MetadataError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentRecord>, MetadataError>;

    /// Records matching every present filter, oldest upload first.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<DocumentRecord>, MetadataError>;

    /// Every record, oldest upload first.
    async fn list(&self) -> Result<Vec<DocumentRecord>, MetadataError> {
        self.search(&SearchFilter::default()).await
    }

    /// Overwrite the stored record with id `id`.
    ///
    /// Fails with [`MetadataError::NotFound`] when no such record exists.
    async fn replace(&self, id: &str, record: &DocumentRecord) -> Result<(), MetadataError>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, MetadataError>;

    /// The subset of `keys` that some record's `blob_key` points at.
    async fn referenced_blob_keys(&self, keys: &[String])
    -> Result<HashSet<String>, MetadataError>;
}

/// Open the metadata store selected by `config`.
pub async fn open_metadata_store(
    config: &MetadataConfig,
) -> Result<Arc<dyn MetadataStore>, DbErr> {
    match config.backend {
        MetadataBackend::Memory => Ok(Arc::new(MemoryMetadataStore::new())),
        MetadataBackend::Postgres => {
            let db = database::init_db(&config.connection_url()).await?;
            database::ensure_indexes(&db).await?;
            Ok(Arc::new(PostgresMetadataStore::new(db)))
        }
    }
}
