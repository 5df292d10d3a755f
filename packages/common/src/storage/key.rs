use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Fixed prefix under which every document blob is written.
pub const DOCUMENT_PREFIX: &str = "documents";

/// A validated object key: `documents/<uuid>/<file name>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey(String);

impl BlobKey {
    /// Generate a fresh, never-reused key for an uploaded file.
    pub fn generate(file_name: &str) -> Self {
        Self(format!(
            "{DOCUMENT_PREFIX}/{}/{}",
            Uuid::new_v4(),
            key_segment(file_name)
        ))
    }

    /// Parse a key read back from a record or a listing.
    pub fn parse(s: impl Into<String>) -> Result<Self, StorageError> {
        let s = s.into();
        if s.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".into()));
        }
        if s.starts_with('/') || s.contains('\\') || s.contains('\0') {
            return Err(StorageError::InvalidKey(format!("{s:?} is not a relative key")));
        }
        if s.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(StorageError::InvalidKey(format!(
                "{s:?} contains an empty or relative segment"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Key segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

/// Make a file name safe to use as the last key segment.
///
/// The record keeps the original name; only the key is rewritten.
fn key_segment(file_name: &str) -> String {
    let cleaned: String = file_name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "blob".to_string(),
        _ => cleaned,
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({})", self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BlobKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}
