use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("docstore_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Create indexes the entity attributes cannot express.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Tag search: WHERE tags @> '["x"]'
    let stmt = "CREATE INDEX IF NOT EXISTS idx_document_tags ON document USING GIN (tags)";

    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index idx_document_tags exists"),
        Err(e) => warn!(error = %e, "Failed to create index idx_document_tags"),
    }

    Ok(())
}
