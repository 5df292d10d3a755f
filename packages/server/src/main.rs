use std::sync::Arc;

use anyhow::Context;
use common::storage::open_blob_store;
use docstore_server::config::AppConfig;
use docstore_server::documents::{DocumentService, sweep};
use docstore_server::state::AppState;
use docstore_server::store::open_metadata_store;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let blobs = open_blob_store(&config.storage)
        .await
        .context("Failed to open blob store")?;
    let metadata = open_metadata_store(&config.metadata)
        .await
        .context("Failed to open metadata store")?;
    info!(
        storage = ?config.storage.backend,
        bucket = %config.storage.bucket,
        metadata = ?config.metadata.backend,
        "Stores ready"
    );

    let documents = Arc::new(DocumentService::new(
        blobs,
        metadata,
        config.consistency.clone(),
    ));
    tokio::spawn(sweep::run_orphan_sweep(
        documents.clone(),
        config.consistency.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = docstore_server::build_router(AppState::new(config, documents));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
