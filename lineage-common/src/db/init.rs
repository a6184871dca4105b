//! Database initialization
//!
//! Opens (or creates) the catalog database and ensures the topic/course
//! schema exists. Table creation is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the catalog database at `db_path`, creating it and its schema if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    // One run owns the catalog; a single connection keeps every statement on
    // the transaction opened by the coordinator.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory catalog database with the schema applied
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    // The database lives only as long as its one connection
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create the topics and courses tables if they don't exist
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_topics_table(pool).await?;
    create_courses_table(pool).await?;
    Ok(())
}

async fn create_topics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY,
            most_recent_id INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            semester TEXT NOT NULL,
            department TEXT NOT NULL,
            code TEXT NOT NULL,
            full_code TEXT NOT NULL,
            title TEXT,
            description TEXT,
            topic_id INTEGER REFERENCES topics(id),
            primary_listing_id INTEGER REFERENCES courses(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_topic ON courses(topic_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_courses_primary_listing ON courses(primary_listing_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_full_code ON courses(full_code)")
        .execute(pool)
        .await?;

    Ok(())
}
