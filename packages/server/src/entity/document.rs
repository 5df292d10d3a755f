use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Descriptive metadata for one stored blob.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub file_name: String,

    pub original_file_name: String,

    pub content_type: String,

    pub file_size: i64,

    /// Object key in the blob store. Never reused.
    #[sea_orm(unique)]
    pub blob_key: String,

    pub blob_bucket: String,

    #[sea_orm(indexed)]
    pub uploaded_at: DateTimeUtc,

    /// JSON array of strings, in insertion order.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    /// JSON object of string values.
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
