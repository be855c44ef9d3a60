use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::error::AppError;

const MIGRATIONS: &[&str] = &[
    include_str!("../migrations/0001_create_chats.sql"),
    include_str!("../migrations/0002_create_messages.sql"),
];

pub async fn init_pool(database_url: &str) -> Result<Pool, AppError> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {e}")))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    let pool = Pool::builder(manager)
        .max_size(16)
        .build()
        .map_err(|e| AppError::StartServer(format!("build pool: {e}")))?;

    Ok(pool)
}

/// Apply the schema at startup. Every statement is idempotent, so this is
/// safe to run on every boot.
pub async fn run_migrations(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    for migration in MIGRATIONS {
        client.batch_execute(migration).await?;
    }
    Ok(())
}
