mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open (or create) a pool for the given SQLite URL with the pragmas this
/// server relies on. Split out of `init` so tests can point it at
/// `sqlite::memory:`.
pub async fn connect(db_url: &str) -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    Ok(pool)
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("wrenchr.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = connect(&db_url).await?;
    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Users and sessions
    execute_sql(pool, include_str!("../../migrations/002_users.sql")).await?;

    // Migration 003: Legacy integer vehicle id for backward-compatible lookup
    let has_legacy_id: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('vehicles') WHERE name = 'legacy_id'",
    )
    .fetch_optional(pool)
    .await?;
    if has_legacy_id.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_vehicle_legacy_id.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
