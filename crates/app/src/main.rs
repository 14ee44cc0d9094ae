use std::sync::Arc;
use std::time::Duration;

use migration::{Migrator, MigratorTrait};

use settings::Database;

mod settings;

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "kopilka={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(
        ledger::Engine::builder()
            .database(db)
            .build()
            .await?,
    );

    let interval_seconds = settings
        .scheduler
        .map(|s| s.interval_seconds)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS);
    let scheduler = ledger::RecurrenceScheduler::new(
        Arc::clone(&engine),
        Duration::from_secs(interval_seconds),
    );
    tasks.spawn(async move {
        tracing::info!(interval_seconds, "starting recurrence scheduler...");
        scheduler.run().await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
