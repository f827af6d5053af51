//! Video repository - database operations for videos.
//!
//! Claim/release logic lives in `services::queue_manager`; this module
//! only provides the plain CRUD surface the rest of the service needs.
use crate::error::Result;
use crate::models::{QueueStats, Video};
use sqlx::SqlitePool;

const COLUMNS: &str =
    "id, channel_id, url, title, status, attempts, last_error, completed_at, created_at";

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Video>> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "SELECT {COLUMNS} FROM videos WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(video)
}

pub async fn get_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Video>> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "SELECT {COLUMNS} FROM videos WHERE url = ?"
    ))
    .bind(url)
    .fetch_optional(pool)
    .await?;
    Ok(video)
}

/// Insert a new pending video row if `url` is not already present.
/// Returns `None` when the row already existed (videos are deduplicated by URL).
///
/// Takes a connection rather than a pool so a caller enumerating many
/// videos (the ingestor) can batch a bounded number of these into one
/// transaction instead of auto-committing each row individually.
pub async fn insert_if_new(
    conn: &mut sqlx::SqliteConnection,
    channel_id: i64,
    url: &str,
    title: &str,
) -> Result<Option<Video>> {
    let existing = sqlx::query_as::<_, Video>(&format!("SELECT {COLUMNS} FROM videos WHERE url = ?"))
        .bind(url)
        .fetch_optional(&mut *conn)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let id = sqlx::query(
        "INSERT INTO videos (channel_id, url, title, status, attempts) \
         VALUES (?, ?, ?, 'pending', 0)",
    )
    .bind(channel_id)
    .bind(url)
    .bind(title)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    let video = sqlx::query_as::<_, Video>(&format!("SELECT {COLUMNS} FROM videos WHERE id = ?"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Some(video))
}

#[derive(Default)]
pub struct VideoFilter {
    pub status: Option<String>,
    pub channel_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list(pool: &SqlitePool, filter: &VideoFilter) -> Result<Vec<Video>> {
    let mut sql = format!("SELECT {COLUMNS} FROM videos WHERE 1=1");
    if filter.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if filter.channel_id.is_some() {
        sql.push_str(" AND channel_id = ?");
    }
    sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, Video>(&sql);
    if let Some(status) = &filter.status {
        query = query.bind(status);
    }
    if let Some(channel_id) = filter.channel_id {
        query = query.bind(channel_id);
    }
    query = query.bind(filter.limit).bind(filter.offset);

    Ok(query.fetch_all(pool).await?)
}

pub async fn list_failed(pool: &SqlitePool, limit: i64) -> Result<Vec<Video>> {
    let videos = sqlx::query_as::<_, Video>(&format!(
        "SELECT {COLUMNS} FROM videos WHERE status = 'failed' ORDER BY id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(videos)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

async fn stats_with_clause(
    pool: &SqlitePool,
    where_clause: &str,
    channel_id: Option<i64>,
) -> Result<QueueStats> {
    let sql = format!(
        "SELECT status, COUNT(*) as count FROM videos {where_clause} GROUP BY status"
    );
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    if let Some(id) = channel_id {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut stats = QueueStats::default();
    for (status, count) in rows {
        match status.as_str() {
            "pending" => stats.pending = count,
            "processing" => stats.processing = count,
            "completed" => stats.completed = count,
            "failed" => stats.failed = count,
            _ => {}
        }
        stats.total += count;
    }
    Ok(stats)
}

/// Global queue statistics.
pub async fn stats(pool: &SqlitePool) -> Result<QueueStats> {
    stats_with_clause(pool, "", None).await
}

/// Queue statistics scoped to one channel.
pub async fn stats_for_channel(pool: &SqlitePool, channel_id: i64) -> Result<QueueStats> {
    stats_with_clause(pool, "WHERE channel_id = ?", Some(channel_id)).await
}
