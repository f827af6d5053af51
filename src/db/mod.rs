//! Database access layer
//!
//! Provides connection pooling against the embedded SQLite store and
//! repository implementations for each entity in the data model.
pub mod channel_repo;
pub mod log_repo;
pub mod setting_repo;
pub mod subtitle_repo;
pub mod video_repo;

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Open the pool, create the parent directory if needed, run migrations,
/// and set the connection lock-wait budget.
pub async fn init_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path))
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_millis(config.lock_wait_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        crate::error::AppError::Internal(format!("migration failed: {e}"))
    })?;

    tracing::info!(path = %config.path, "store migrations applied");
    Ok(pool)
}

/// Open an in-memory pool for tests; single connection so the migrated
/// schema is visible to every query against the pool. Exposed
/// unconditionally (not `#[cfg(test)]`) so the `tests/` integration
/// suite, which depends on this crate as an ordinary library, can use it.
pub async fn init_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory store");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}
