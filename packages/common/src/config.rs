use std::path::PathBuf;

use serde::Deserialize;

/// Which blob storage backend to open.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Any S3-compatible object store (AWS S3, MinIO, R2, ...).
    #[default]
    S3,
    /// Local directory tree. Useful for development and tests.
    Filesystem,
}

/// Blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend selection. Default: `s3`.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name, also recorded on every document. Default: "documents".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// AWS region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3-compatible endpoint. When set, path-style addressing is used.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Empty means "resolve from the environment / instance profile".
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_filesystem_path")]
    pub filesystem_path: PathBuf,
    /// Maximum accepted blob size in bytes. Default: 256 MiB. The server
    /// bounds each upload transfer separately (`consistency.transfer_timeout_secs`).
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
}

fn default_bucket() -> String {
    "documents".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_filesystem_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    256 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            filesystem_path: default_filesystem_path(),
            max_blob_size: default_max_blob_size(),
        }
    }
}
