use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{MetadataError, MetadataStore};
use crate::documents::{DocumentRecord, NewDocument, SearchFilter};
use crate::entity::document;

/// Metadata store backed by the `document` table.
///
/// Tags and metadata live in JSONB columns; tag search uses containment so the
/// GIN index on `tags` applies.
pub struct PostgresMetadataStore {
    db: DatabaseConnection,
}

impl PostgresMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Escape LIKE wildcard characters in a search string.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn tags_json(tags: &[String]) -> JsonValue {
    JsonValue::from(tags.to_vec())
}

fn metadata_json(metadata: &BTreeMap<String, String>) -> JsonValue {
    JsonValue::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect(),
    )
}

fn to_record(model: document::Model) -> Result<DocumentRecord, MetadataError> {
    let id = model.id.to_string();
    let corrupt = |reason: String| MetadataError::Corrupt {
        id: id.clone(),
        reason,
    };

    let tags: Vec<String> =
        serde_json::from_value(model.tags).map_err(|e| corrupt(format!("tags: {e}")))?;
    let metadata: BTreeMap<String, String> =
        serde_json::from_value(model.metadata).map_err(|e| corrupt(format!("metadata: {e}")))?;
    let file_size =
        u64::try_from(model.file_size).map_err(|_| corrupt("negative file_size".into()))?;

    Ok(DocumentRecord {
        id,
        file_name: model.file_name,
        original_file_name: model.original_file_name,
        content_type: model.content_type,
        file_size,
        blob_key: model.blob_key,
        blob_bucket: model.blob_bucket,
        uploaded_at: model.uploaded_at,
        tags,
        metadata,
        description: model.description,
    })
}

fn search_query(filter: &SearchFilter) -> Select<document::Entity> {
    let mut query = document::Entity::find();

    if let Some(pattern) = &filter.file_name {
        let term = escape_like(&pattern.to_lowercase());
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(document::Column::FileName)))
                .like(LikeExpr::new(format!("%{term}%")).escape('\\')),
        );
    }
    if let Some(tag) = &filter.tag {
        query = query.filter(Expr::cust_with_values(
            "\"tags\" @> ?",
            [serde_json::json!([tag])],
        ));
    }
    if let Some(after) = filter.uploaded_after {
        query = query.filter(document::Column::UploadedAt.gte(after));
    }

    query
        .order_by_asc(document::Column::UploadedAt)
        .order_by_asc(document::Column::Id)
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn insert(&self, doc: NewDocument) -> Result<DocumentRecord, MetadataError> {
        let file_size = i64::try_from(doc.file_size).unwrap_or(i64::MAX);
        let model = document::ActiveModel {
            id: Set(Uuid::now_v7()),
            file_name: Set(doc.file_name),
            original_file_name: Set(doc.original_file_name),
            content_type: Set(doc.content_type),
            file_size: Set(file_size),
            blob_key: Set(doc.blob_key),
            blob_bucket: Set(doc.blob_bucket),
            uploaded_at: Set(doc.uploaded_at),
            tags: Set(tags_json(&doc.tags)),
            metadata: Set(metadata_json(&doc.metadata)),
            description: Set(doc.description),
        };

        let inserted = model.insert(&self.db).await?;
        to_record(inserted)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentRecord>, MetadataError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        document::Entity::find_by_id(uuid)
            .one(&self.db)
            .await?
            .map(to_record)
            .transpose()
    }

    async fn search(&self, filter: &SearchFilter) -> Result<Vec<DocumentRecord>, MetadataError> {
        search_query(filter)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_record)
            .collect()
    }

    async fn replace(&self, id: &str, record: &DocumentRecord) -> Result<(), MetadataError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Err(MetadataError::NotFound(id.to_string()));
        };
        let file_size = i64::try_from(record.file_size).unwrap_or(i64::MAX);

        let result = document::Entity::update_many()
            .col_expr(document::Column::FileName, Expr::value(record.file_name.clone()))
            .col_expr(
                document::Column::OriginalFileName,
                Expr::value(record.original_file_name.clone()),
            )
            .col_expr(
                document::Column::ContentType,
                Expr::value(record.content_type.clone()),
            )
            .col_expr(document::Column::FileSize, Expr::value(file_size))
            .col_expr(document::Column::BlobKey, Expr::value(record.blob_key.clone()))
            .col_expr(
                document::Column::BlobBucket,
                Expr::value(record.blob_bucket.clone()),
            )
            .col_expr(document::Column::UploadedAt, Expr::value(record.uploaded_at))
            .col_expr(document::Column::Tags, Expr::value(tags_json(&record.tags)))
            .col_expr(
                document::Column::Metadata,
                Expr::value(metadata_json(&record.metadata)),
            )
            .col_expr(
                document::Column::Description,
                Expr::value(record.description.clone()),
            )
            .filter(document::Column::Id.eq(uuid))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(MetadataError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, MetadataError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let result = document::Entity::delete_by_id(uuid).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn referenced_blob_keys(
        &self,
        keys: &[String],
    ) -> Result<HashSet<String>, MetadataError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let referenced: Vec<String> = document::Entity::find()
            .select_only()
            .column(document::Column::BlobKey)
            .filter(document::Column::BlobKey.is_in(keys.to_vec()))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(referenced.into_iter().collect())
    }
}
