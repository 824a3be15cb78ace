//! Database initialization
//!
//! Opens (creating if necessary) the shared `wrrl.db` SQLite database and
//! brings its schema up idempotently. Missing databases are created on
//! first run; startup never requires manual schema steps.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Initialize the database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers with the single journal writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Default busy timeout, re-applied from settings below
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Idempotent schema creation
    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_journal_table(&pool).await?;

    init_default_settings(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs (shared secret,
/// bootstrap admin, tunables).
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

/// Create the command journal table
///
/// One row per submitted ledger command, accepted or rejected, in total
/// order. `seq` is allocated by the single writer; `accepted`/`error` are
/// filled in after apply as a best-effort audit trail.
pub async fn create_journal_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journal (
            seq INTEGER PRIMARY KEY,
            submitted_at TEXT NOT NULL,
            caller TEXT NOT NULL,
            command TEXT NOT NULL,
            accepted INTEGER,
            error TEXT,
            CHECK (seq > 0),
            CHECK (length(caller) = 36)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or repair default settings
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;
    ensure_setting(pool, "http_max_body_size_bytes", "1048576").await?;
    ensure_setting(pool, "journal_browse_max_limit", "500").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value.
///
/// Creates the setting when missing; resets NULL values to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Generic setting getter
///
/// Returns None if the key doesn't exist; parses the stored string via
/// FromStr otherwise.
pub async fn get_setting<T: std::str::FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(crate::Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Load the bootstrap administrator identity, initializing it on first run.
///
/// Resolution order: the stored settings value wins once set; otherwise the
/// configured identity (CLI/env/TOML) is stored; otherwise a fresh identity
/// is generated, stored, and logged so the operator can capture it.
pub async fn load_or_init_bootstrap_admin(
    pool: &SqlitePool,
    configured: Option<Uuid>,
) -> Result<Uuid> {
    let stored: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'bootstrap_admin'")
            .fetch_optional(pool)
            .await?;

    if let Some(value) = stored {
        let admin = Uuid::parse_str(&value)
            .map_err(|e| crate::Error::Config(format!("Invalid bootstrap_admin setting: {}", e)))?;
        if let Some(requested) = configured {
            if requested != admin {
                warn!(
                    "Configured bootstrap admin {} ignored; database already pins {}",
                    requested, admin
                );
            }
        }
        return Ok(admin);
    }

    let admin = match configured {
        Some(identity) => identity,
        None => {
            let generated = Uuid::new_v4();
            info!("No bootstrap admin configured; generated {}", generated);
            generated
        }
    };

    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ('bootstrap_admin', ?)")
        .bind(admin.to_string())
        .execute(pool)
        .await?;

    // Re-read in case a concurrent initializer won the insert race
    let value: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'bootstrap_admin'")
        .fetch_one(pool)
        .await?;
    let admin = Uuid::parse_str(&value)
        .map_err(|e| crate::Error::Config(format!("Invalid bootstrap_admin setting: {}", e)))?;

    info!("Bootstrap administrator: {}", admin);
    Ok(admin)
}
