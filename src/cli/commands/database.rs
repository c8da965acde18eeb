use anyhow::Context;
use sqlx::PgPool;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{self, StoreBackend};
use crate::database::DatabaseManager;

/// Connects to the configured Postgres database; the CLI has no use for the memory store
pub async fn connect() -> anyhow::Result<PgPool> {
    let config = config::config();
    if config.database.backend != StoreBackend::Postgres {
        anyhow::bail!("this command needs STORE_BACKEND=postgres and DATABASE_URL");
    }
    DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to Postgres")
}

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    DatabaseManager::migrate(&pool).await?;
    output_success(&output_format, "Database schema is up to date", None)
}
