/// Database migration runner
///
/// Migrations live in the workspace-level `migrations/` directory and are
/// embedded into the binary at compile time with `sqlx::migrate!`.
///
/// # Example
///
/// ```no_run
/// use colabora_shared::db::pool::{create_pool, DatabaseConfig};
/// use colabora_shared::db::migrations::{get_migration_status, run_migrations};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// println!("Applied {} migrations", status.applied_migrations);
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, migrate::Migrator, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Embedded migrations, path relative to this crate's Cargo.toml
static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of successfully applied migrations
    pub applied_migrations: usize,

    /// Latest applied migration version (timestamp)
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Runs all pending migrations
///
/// Already applied migrations are skipped, so this is safe to call on every
/// startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Database migrations up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Reports how many migrations have been applied
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: MIGRATOR.iter().next().is_none(),
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    let applied = usize::try_from(count).unwrap_or_default();

    Ok(MigrationStatus {
        applied_migrations: applied,
        latest_version,
        is_up_to_date: applied >= MIGRATOR.iter().count(),
    })
}

/// Creates the database if it does not exist yet
///
/// Meant for development and test setups; production databases are
/// provisioned separately.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert_eq!(versions.len(), 3);
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
