//! GraphQL query surface over the document service.

mod handler;
mod schema;

pub use handler::graphql_handler;
pub use schema::{
    DocumentObject, DocumentSchema, MetadataEntry, MetadataEntryInput, MutationRoot, QueryRoot,
    build_schema,
};
