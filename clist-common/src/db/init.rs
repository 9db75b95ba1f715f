//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date on
//! every start. All statements are idempotent.

use crate::db::models::fold_text;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database and initialize the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and default settings
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_preview_sessions_table(pool).await?;
    create_vendors_table(pool).await?;
    create_survey_pending_ratings_table(pool).await?;
    create_match_sessions_table(pool).await?;

    crate::db::settings::init_default_settings(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_preview_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS preview_sessions (
            id TEXT PRIMARY KEY,
            community TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vendors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vendors (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            community TEXT NOT NULL,
            contact_info TEXT,
            website TEXT,
            description TEXT,
            google_place_id TEXT,
            name_folded TEXT,
            contact_folded TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    add_vendor_fold_columns(pool).await?;
    backfill_vendor_fold_columns(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vendors_community_category ON vendors(community, category, name_folded)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Add the folded-text columns to vendor tables created before they existed
async fn add_vendor_fold_columns(pool: &SqlitePool) -> Result<()> {
    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('vendors')")
        .fetch_all(pool)
        .await?;

    for column in ["name_folded", "contact_folded"] {
        if !columns.iter().any(|c| c == column) {
            sqlx::query(&format!("ALTER TABLE vendors ADD COLUMN {} TEXT", column))
                .execute(pool)
                .await?;
            info!("Added vendors.{} column", column);
        }
    }

    Ok(())
}

/// Fill folded columns for rows written without them
///
/// SQLite's `LOWER()` only folds ASCII, so folding happens here in Rust.
async fn backfill_vendor_fold_columns(pool: &SqlitePool) -> Result<()> {
    let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
        "SELECT id, name, contact_info FROM vendors WHERE name_folded IS NULL",
    )
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (id, name, contact_info) in &rows {
        sqlx::query("UPDATE vendors SET name_folded = ?, contact_folded = ? WHERE id = ?")
            .bind(fold_text(name))
            .bind(contact_info.as_deref().map(fold_text))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!("Backfilled folded names for {} vendors", rows.len());
    Ok(())
}

async fn create_survey_pending_ratings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_pending_ratings (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            vendor_name TEXT NOT NULL,
            category TEXT NOT NULL,
            vendor_id TEXT REFERENCES vendors(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_ratings_session ON survey_pending_ratings(session_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_match_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_sessions (
            session_id TEXT PRIMARY KEY,
            preview_session_id TEXT NOT NULL,
            community TEXT NOT NULL,
            queue TEXT NOT NULL DEFAULT '[]',
            current_index INTEGER NOT NULL DEFAULT 0,
            step TEXT NOT NULL,
            outcomes TEXT NOT NULL DEFAULT '[]',
            notice TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
