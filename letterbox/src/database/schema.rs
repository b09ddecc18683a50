//! Database schema and migrations
//!
//! Migrations are numbered SQL scripts compiled into the binary. Each one
//! runs in its own transaction together with the row that records it, so a
//! crash mid-migration leaves the previous version intact.
//!
//! Journal mode and foreign keys are per-connection settings; see
//! `connect_options` in the parent module.

use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::sqlite::SqlitePool;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: include_str!("migrations/001_initial_schema.sql"),
}];

fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Bring the schema up to date.
///
/// Fails without touching anything if the database was written by a newer
/// build than this one.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current = schema_version(pool).await?;
    let latest = latest_version();

    if current > latest {
        return Err(AppError::Generic(format!(
            "Database schema version {} is newer than supported version {}",
            current, latest
        )));
    }

    if current == latest {
        tracing::debug!("Database schema is current (version {})", current);
        return Ok(());
    }

    tracing::info!("Migrating database schema from version {} to {}", current, latest);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;

        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;

        sqlx::query("INSERT INTO migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Applied migration {} ({})", migration.version, migration.name);
    }

    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    let version = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?;

    Ok(version)
}
