//! Settings and job singleton repositories.
use crate::error::{AppError, Result};
use crate::models::{Job, Setting};
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool) -> Result<Setting> {
    let setting = sqlx::query_as::<_, Setting>(
        "SELECT id, max_workers, max_retries, backoff_factor, output_dir FROM settings WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(setting)
}

/// Apply validated range updates: max_workers 1..20, max_retries 0..10,
/// backoff_factor 1.0..10.0.
pub async fn update(
    pool: &SqlitePool,
    max_workers: i64,
    max_retries: i64,
    backoff_factor: f64,
    output_dir: &str,
) -> Result<Setting> {
    if !(1..=20).contains(&max_workers) {
        return Err(AppError::Validation("max_workers must be in 1..=20".into()));
    }
    if !(0..=10).contains(&max_retries) {
        return Err(AppError::Validation("max_retries must be in 0..=10".into()));
    }
    if !(1.0..=10.0).contains(&backoff_factor) {
        return Err(AppError::Validation(
            "backoff_factor must be in 1.0..=10.0".into(),
        ));
    }

    sqlx::query(
        "UPDATE settings SET max_workers = ?, max_retries = ?, backoff_factor = ?, output_dir = ? \
         WHERE id = 1",
    )
    .bind(max_workers)
    .bind(max_retries)
    .bind(backoff_factor)
    .bind(output_dir)
    .execute(pool)
    .await?;

    get(pool).await
}

pub async fn get_job(pool: &SqlitePool) -> Result<Job> {
    let job = sqlx::query_as::<_, Job>(
        "SELECT id, status, active_workers, started_at, stopped_at FROM job WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(job)
}

pub async fn set_job_status(
    pool: &SqlitePool,
    status: &str,
    active_workers: i64,
    touch_started: bool,
    touch_stopped: bool,
) -> Result<Job> {
    if touch_started {
        sqlx::query(
            "UPDATE job SET status = ?, active_workers = ?, \
             started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = 1",
        )
        .bind(status)
        .bind(active_workers)
        .execute(pool)
        .await?;
    } else if touch_stopped {
        sqlx::query(
            "UPDATE job SET status = ?, active_workers = ?, \
             stopped_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = 1",
        )
        .bind(status)
        .bind(active_workers)
        .execute(pool)
        .await?;
    } else {
        sqlx::query("UPDATE job SET status = ?, active_workers = ? WHERE id = 1")
            .bind(status)
            .bind(active_workers)
            .execute(pool)
            .await?;
    }
    get_job(pool).await
}
