use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await
        .context("Failed to clear schema version")?;

    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await
        .context("Failed to set schema version")?;

    Ok(())
}

/// v1: the posts archive.
///
/// `id` uses AUTOINCREMENT so surrogate keys are never reused, even after a
/// rowid-reclaiming vacuum. `source_message_id` carries the uniqueness
/// constraint that makes ingestion idempotent. The `(category, event_time)`
/// index backs filtered, paginated retrieval in newest-first order.
async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_message_id INTEGER NOT NULL UNIQUE,
            content TEXT NOT NULL DEFAULT '',
            media_kind TEXT NOT NULL DEFAULT 'text',
            category TEXT NOT NULL DEFAULT 'general',
            event_time INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create posts table")?;

    sqlx::query(
        r"
        CREATE INDEX IF NOT EXISTS idx_posts_event_time
        ON posts (event_time DESC, id DESC)
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create event_time index")?;

    sqlx::query(
        r"
        CREATE INDEX IF NOT EXISTS idx_posts_category_event_time
        ON posts (category, event_time DESC, id DESC)
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create category index")?;

    Ok(())
}
