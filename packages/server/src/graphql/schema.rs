use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, InputObject, Object, Schema, SimpleObject,
};
use chrono::{DateTime, Utc};

use crate::documents::{DocumentError, DocumentRecord, DocumentService, DocumentUpdate, SearchFilter};

pub type DocumentSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(documents: Arc<DocumentService>) -> DocumentSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(documents)
        .finish()
}

/// One metadata key/value pair.
#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

#[derive(InputObject, Clone, Debug)]
pub struct MetadataEntryInput {
    pub key: String,
    pub value: String,
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "Document")]
pub struct DocumentObject {
    pub id: String,
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub blob_key: String,
    pub blob_bucket: String,
    pub uploaded_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataEntry>,
    pub description: Option<String>,
}

impl From<DocumentRecord> for DocumentObject {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            original_file_name: record.original_file_name,
            content_type: record.content_type,
            file_size: record.file_size,
            blob_key: record.blob_key,
            blob_bucket: record.blob_bucket,
            uploaded_at: record.uploaded_at,
            tags: record.tags,
            metadata: record
                .metadata
                .into_iter()
                .map(|(key, value)| MetadataEntry { key, value })
                .collect(),
            description: record.description,
        }
    }
}

fn service<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<DocumentService>> {
    ctx.data::<Arc<DocumentService>>()
}

/// Map a service failure to a GraphQL error with a `code` extension.
fn graphql_error(err: DocumentError) -> async_graphql::Error {
    let (code, message) = match err {
        DocumentError::NotFound(_) => ("NOT_FOUND", "Document not found".to_string()),
        DocumentError::InvalidInput(msg) => ("VALIDATION_ERROR", msg),
        DocumentError::EmptyUpload => ("VALIDATION_ERROR", "No file uploaded".to_string()),
        other => {
            tracing::error!("Internal error: {}", other);
            ("INTERNAL_ERROR", "An unexpected error occurred".to_string())
        }
    };
    async_graphql::Error::new(message).extend_with(|_, e| e.set("code", code))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All documents, oldest upload first.
    async fn documents(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<DocumentObject>> {
        let records = service(ctx)?.list().await.map_err(graphql_error)?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// A single document, or null when it does not exist.
    async fn document(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Option<DocumentObject>> {
        let record = service(ctx)?.find(&id).await.map_err(graphql_error)?;
        Ok(record.map(Into::into))
    }

    /// Documents matching every given filter. `fileName` is a case-insensitive
    /// substring, `tag` an exact tag, `fromDate` an inclusive lower bound on
    /// the upload time. `fileName` is not a regular expression: characters
    /// such as `^`, `.` and `*` match themselves.
    async fn search_documents(
        &self,
        ctx: &Context<'_>,
        file_name: Option<String>,
        tag: Option<String>,
        from_date: Option<DateTime<Utc>>,
    ) -> async_graphql::Result<Vec<DocumentObject>> {
        let filter = SearchFilter::new(file_name, tag, from_date);
        let records = service(ctx)?
            .search(&filter)
            .await
            .map_err(graphql_error)?;
        Ok(records.into_iter().map(Into::into).collect())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Change descriptive fields. Omitted arguments are left unchanged.
    async fn update_document(
        &self,
        ctx: &Context<'_>,
        id: String,
        description: Option<String>,
        tags: Option<Vec<String>>,
        metadata: Option<Vec<MetadataEntryInput>>,
    ) -> async_graphql::Result<DocumentObject> {
        let update = DocumentUpdate {
            description,
            tags,
            metadata: metadata.map(|entries| {
                entries
                    .into_iter()
                    .map(|e| (e.key, e.value))
                    .collect::<BTreeMap<_, _>>()
            }),
        };
        let record = service(ctx)?
            .update(&id, update)
            .await
            .map_err(graphql_error)?;
        Ok(record.into())
    }

    /// Delete a document and its blob. False when it does not exist.
    async fn delete_document(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<bool> {
        service(ctx)?.delete(&id).await.map_err(graphql_error)
    }
}
