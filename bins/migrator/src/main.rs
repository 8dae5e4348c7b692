//! Rivena migration runner.
//!
//! Applies pending migrations; `REFRESH=1` drops and recreates the schema.

use sea_orm_migration::MigratorTrait;
use tracing::info;

use rivena_db::migration::Migrator;
use rivena_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load()?;
    let db = rivena_db::connect(&config.database.url).await?;

    if std::env::var("REFRESH").is_ok() {
        info!("Refreshing database schema");
        Migrator::fresh(&db).await?;
    } else {
        info!("Applying pending migrations");
        Migrator::up(&db, None).await?;
    }

    info!("Migrations complete");
    Ok(())
}
