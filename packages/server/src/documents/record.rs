use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::storage::BoxReader;

/// A stored document: descriptive metadata plus the locator of its blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Store-assigned identifier. Immutable.
    pub id: String,
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    /// Number of bytes in the blob.
    pub file_size: u64,
    /// Blob store key, `documents/<uuid>/<file name>`.
    pub blob_key: String,
    pub blob_bucket: String,
    pub uploaded_at: DateTime<Utc>,
    /// Insertion order; duplicates and empty entries are kept.
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
}

/// A record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub blob_key: String,
    pub blob_bucket: String,
    pub uploaded_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
}

impl NewDocument {
    pub fn into_record(self, id: String) -> DocumentRecord {
        DocumentRecord {
            id,
            file_name: self.file_name,
            original_file_name: self.original_file_name,
            content_type: self.content_type,
            file_size: self.file_size,
            blob_key: self.blob_key,
            blob_bucket: self.blob_bucket,
            uploaded_at: self.uploaded_at,
            tags: self.tags,
            metadata: self.metadata,
            description: self.description,
        }
    }
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl DocumentUpdate {
    /// Apply to `record`, returning whether anything changed.
    pub fn apply(self, record: &mut DocumentRecord) -> bool {
        let mut changed = false;

        if let Some(description) = self.description
            && record.description.as_deref() != Some(description.as_str())
        {
            record.description = Some(description);
            changed = true;
        }
        if let Some(tags) = self.tags
            && record.tags != tags
        {
            record.tags = tags;
            changed = true;
        }
        if let Some(metadata) = self.metadata
            && record.metadata != metadata
        {
            record.metadata = metadata;
            changed = true;
        }

        changed
    }
}

/// Conjunctive search filters. Absent (or empty) filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring of `file_name`.
    pub file_name: Option<String>,
    /// Exact, case-sensitive tag element.
    pub tag: Option<String>,
    /// Inclusive lower bound on `uploaded_at`.
    pub uploaded_after: Option<DateTime<Utc>>,
}

impl SearchFilter {
    pub fn new(
        file_name: Option<String>,
        tag: Option<String>,
        uploaded_after: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            file_name: file_name.filter(|s| !s.is_empty()),
            tag: tag.filter(|s| !s.is_empty()),
            uploaded_after,
        }
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        if let Some(pattern) = &self.file_name
            && !record
                .file_name
                .to_lowercase()
                .contains(&pattern.to_lowercase())
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !record.tags.iter().any(|t| t == tag)
        {
            return false;
        }
        if let Some(after) = self.uploaded_after
            && record.uploaded_at < after
        {
            return false;
        }
        true
    }
}

/// An open blob stream together with what a client needs to save it.
pub struct DocumentDownload {
    pub content: BoxReader,
    pub content_type: String,
    pub file_name: String,
    pub size: u64,
}

/// A presigned download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrl {
    pub url: String,
    pub expires_in_minutes: u32,
}
