//! Database migration management

use sqlx::PgPool;
use tracing::{error, info};

use crate::error::{AppError, Result};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "001_initial_schema",
    sql: include_str!("../migrations/001_initial_schema.sql"),
}];

/// Apply every migration not yet recorded in `schema_migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version VARCHAR(255) PRIMARY KEY,
            applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(pool)
        .await?;

        if applied {
            info!(version = migration.version, "Migration already applied");
            continue;
        }

        info!(version = migration.version, "Applying migration");

        // Schema and bookkeeping land together or not at all
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(version = migration.version, error = %e, "Migration failed");
                AppError::Database(e)
            })?;
        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    info!("All migrations completed successfully");
    Ok(())
}
