//! Database pool setup and schema management
//!
//! The engine persists to SQLite through sqlx. All stores share one
//! [`SqlitePool`]; `sqlite::memory:` gives an ephemeral engine for tests and
//! demo deployments. Schema creation is idempotent and runs at startup.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Connect to the configured database and ensure the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true);

    // An in-memory database is private to its connection: the pool must pin
    // exactly one connection and never reap it, or the data vanishes.
    let in_memory = config.database_url.contains(":memory:")
        || config.database_url.contains("mode=memory");
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    init_schema(&pool).await?;
    info!("Database ready at {}", config.database_url);
    Ok(pool)
}

/// Create the engine tables if they do not exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS call_sessions (
            tenant_id         TEXT NOT NULL,
            call_id           TEXT NOT NULL,
            from_number       TEXT NOT NULL,
            to_number         TEXT NOT NULL,
            did               TEXT NOT NULL,
            direction         TEXT NOT NULL,
            status            TEXT NOT NULL,
            started_at        TEXT NOT NULL,
            ended_at          TEXT,
            path              TEXT NOT NULL,
            outcome           TEXT,
            tags              TEXT NOT NULL DEFAULT '[]',
            cdr               TEXT,
            total_steps       INTEGER NOT NULL DEFAULT 0,
            ai_steps          INTEGER NOT NULL DEFAULT 0,
            api_calls         INTEGER NOT NULL DEFAULT 0,
            duration_seconds  INTEGER,
            external_call_ref TEXT,
            version           INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (tenant_id, call_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ivr_flows (
            id              TEXT PRIMARY KEY,
            tenant_id       TEXT NOT NULL,
            name            TEXT NOT NULL,
            greeting        TEXT NOT NULL,
            timeout_seconds INTEGER NOT NULL,
            max_digits      INTEGER NOT NULL,
            retries         INTEGER NOT NULL,
            options         TEXT NOT NULL,
            default_option  TEXT,
            fallback        TEXT,
            active          INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ivr_flows_tenant_active
         ON ivr_flows (tenant_id, active, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS extensions (
            tenant_id        TEXT NOT NULL,
            extension_number TEXT NOT NULL,
            name             TEXT NOT NULL,
            status           TEXT NOT NULL,
            department_id    TEXT,
            dial_plan        TEXT NOT NULL,
            PRIMARY KEY (tenant_id, extension_number)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS departments (
            id        TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name      TEXT NOT NULL,
            greeting  TEXT,
            UNIQUE (tenant_id, name)
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
