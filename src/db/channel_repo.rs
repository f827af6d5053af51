//! Channel repository - database operations for channels.
use crate::error::Result;
use crate::models::Channel;
use sqlx::SqlitePool;

/// Fetch a channel by its normalized URL, if one exists.
pub async fn get_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Channel>> {
    let channel = sqlx::query_as::<_, Channel>(
        "SELECT id, url, name, total_videos, ingestion_completed_at, created_at FROM channels WHERE url = ?",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;
    Ok(channel)
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Channel>> {
    let channel = sqlx::query_as::<_, Channel>(
        "SELECT id, url, name, total_videos, ingestion_completed_at, created_at FROM channels WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(channel)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Channel>> {
    let channels = sqlx::query_as::<_, Channel>(
        "SELECT id, url, name, total_videos, ingestion_completed_at, created_at FROM channels ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(channels)
}

/// Insert a new channel row with the "Loading" name sentinel.
pub async fn create(pool: &SqlitePool, url: &str, name: &str) -> Result<Channel> {
    let id = sqlx::query("INSERT INTO channels (url, name, total_videos) VALUES (?, ?, 0)")
        .bind(url)
        .bind(name)
        .execute(pool)
        .await?
        .last_insert_rowid();

    get_by_id(pool, id)
        .await?
        .ok_or_else(|| crate::error::AppError::Internal("channel vanished after insert".into()))
}

pub async fn set_name(pool: &SqlitePool, id: i64, name: &str) -> Result<()> {
    sqlx::query("UPDATE channels SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_total_videos(pool: &SqlitePool, id: i64, total: i64) -> Result<()> {
    sqlx::query("UPDATE channels SET total_videos = ? WHERE id = ?")
        .bind(total)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Stamp the channel as having finished an enumeration pass, successful
/// or not, so the ingestion-status endpoint can report `completed_at`.
pub async fn mark_ingestion_completed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE channels SET ingestion_completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM channels WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn count_videos(pool: &SqlitePool, channel_id: i64) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos WHERE channel_id = ?")
        .bind(channel_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}
