pub mod migrations;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply every pending migration step in ledger order (safe to call on every
/// startup — applied steps are skipped).
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let applied = migrations::runner::run_pending(pool).await?;
    if applied > 0 {
        tracing::info!("Applied {} pending migration(s)", applied);
    }
    Ok(())
}
