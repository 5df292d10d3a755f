use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{MetadataError, MetadataStore};
use crate::documents::{DocumentRecord, NewDocument, SearchFilter};

/// Process-local metadata store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: DashMap<String, DocumentRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, document: NewDocument) -> Result<DocumentRecord, MetadataError> {
        let record = document.into_record(Uuid::now_v7().to_string());
        self.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentRecord>, MetadataError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn search(&self, filter: &SearchFilter) -> Result<Vec<DocumentRecord>, MetadataError> {
        let mut matched: Vec<DocumentRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        // v7 ids break ties in insertion order.
        matched.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn replace(&self, id: &str, record: &DocumentRecord) -> Result<(), MetadataError> {
        let Some(mut slot) = self.records.get_mut(id) else {
            return Err(MetadataError::NotFound(id.to_string()));
        };
        *slot = DocumentRecord {
            id: id.to_string(),
            ..record.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, MetadataError> {
        Ok(self.records.remove(id).is_some())
    }

    async fn referenced_blob_keys(
        &self,
        keys: &[String],
    ) -> Result<HashSet<String>, MetadataError> {
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        Ok(self
            .records
            .iter()
            .filter(|r| wanted.contains(r.blob_key.as_str()))
            .map(|r| r.blob_key.clone())
            .collect())
    }
}
