//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for artifacts, versions and messages.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            prompt TEXT NOT NULL,
            category TEXT NOT NULL,
            visibility TEXT NOT NULL CHECK (visibility IN ('public', 'private', 'unlisted')),
            owner_id TEXT NOT NULL,
            current_version INTEGER CHECK (current_version IS NULL OR current_version >= 1),
            content TEXT NOT NULL DEFAULT '',
            instructions TEXT,
            deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id),
            version_number INTEGER NOT NULL CHECK (version_number >= 1),
            content TEXT NOT NULL,
            instructions TEXT,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_artifact_number
            ON versions(artifact_id, version_number);
        "#,
    )
    .execute(pool)
    .await?;

    // The version log is append-only
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS versions_no_update
        BEFORE UPDATE ON versions
        BEGIN
            SELECT RAISE(ABORT, 'versions are immutable');
        END;

        CREATE TRIGGER IF NOT EXISTS versions_no_delete
        BEFORE DELETE ON versions
        BEGIN
            SELECT RAISE(ABORT, 'versions are immutable');
        END;
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id),
            message TEXT NOT NULL,
            response TEXT,
            is_system INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_artifacts_owner ON artifacts(owner_id);
        CREATE INDEX IF NOT EXISTS idx_artifacts_created_at ON artifacts(created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_artifact ON messages(artifact_id, created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
