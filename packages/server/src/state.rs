use std::sync::Arc;

use crate::config::AppConfig;
use crate::documents::DocumentService;
use crate::graphql::DocumentSchema;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub documents: Arc<DocumentService>,
    pub schema: DocumentSchema,
}

impl AppState {
    pub fn new(config: AppConfig, documents: Arc<DocumentService>) -> Self {
        let schema = crate::graphql::build_schema(documents.clone());
        Self {
            config: Arc::new(config),
            documents,
            schema,
        }
    }
}
