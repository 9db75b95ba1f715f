//! Runtime settings stored in the `settings` table

use sqlx::SqlitePool;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

use crate::Result;

/// Maximum rows returned by a fuzzy vendor search
pub const SEARCH_RESULT_LIMIT: &str = "search_result_limit";

/// Upper bound on lock-retry time for a single write
pub const MAX_LOCK_WAIT_MS: &str = "max_lock_wait_ms";

/// Seconds an untouched match session stays in memory
pub const SESSION_IDLE_TIMEOUT_SECS: &str = "session_idle_timeout_secs";

/// Ensure all required settings exist with default values
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, SEARCH_RESULT_LIMIT, "10").await?;
    ensure_setting(pool, MAX_LOCK_WAIT_MS, "5000").await?;
    ensure_setting(pool, SESSION_IDLE_TIMEOUT_SECS, "1800").await?;
    Ok(())
}

/// Insert `key` with `default_value` if missing; reset NULL values to the default
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match existing {
        None => {
            // INSERT OR IGNORE tolerates concurrent initialization
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;
            warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}

/// Read a setting, falling back to `default` when missing or unparsable
pub async fn get_setting<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!("Invalid value for setting '{}' ({}): {}, using {}", key, raw, e, default);
                Ok(default)
            }
        },
        None => Ok(default),
    }
}

/// Write a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
