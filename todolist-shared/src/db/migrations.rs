/// Database migration runner
///
/// Migrations live in the workspace `migrations/` directory and are embedded
/// into the binary at compile time. Each one is a reversible pair:
/// - `{version}_{name}.up.sql`
/// - `{version}_{name}.down.sql`

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Runs all pending migrations
///
/// Each migration runs in its own transaction; a failing migration is rolled
/// back and reported.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("Database migrations completed");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Creates the database if it doesn't exist yet
///
/// Meant for development and test setups; production databases are
/// provisioned ahead of time.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}
