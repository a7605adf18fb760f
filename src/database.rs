use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, sqlx::PgPool};
use tracing::info;

/// Connects, applies pending migrations and opens the pool used by the
/// session store.
pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = Database::connect(db_url)
        .await
        .context("Cannot connect to db")?;
    Migrator::up(&db, None)
        .await
        .context("Cannot apply migrations")?;
    info!("database migrated");

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}
