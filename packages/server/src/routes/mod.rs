use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::document;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/documents", document_routes(config))
}

fn document_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(document::upload_document))
        .layer(document::upload_body_limit(config.storage.max_blob_size));

    OpenApiRouter::new()
        .merge(upload)
        .routes(routes!(document::get_document, document::delete_document))
        .routes(routes!(document::download_document))
        .routes(routes!(document::get_download_url))
}
