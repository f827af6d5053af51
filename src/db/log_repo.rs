//! Append-only log repository.
use crate::error::Result;
use crate::models::LogRow;
use sqlx::SqlitePool;

pub async fn insert(pool: &SqlitePool, level: &str, message: &str, video_id: Option<i64>) -> Result<()> {
    sqlx::query("INSERT INTO logs (video_id, level, message) VALUES (?, ?, ?)")
        .bind(video_id)
        .bind(level)
        .bind(message)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Default)]
pub struct LogFilter {
    pub level: Option<String>,
    pub video_id: Option<i64>,
    pub limit: i64,
}

pub async fn list(pool: &SqlitePool, filter: &LogFilter) -> Result<Vec<LogRow>> {
    let mut sql =
        "SELECT id, video_id, level, message, timestamp FROM logs WHERE 1=1".to_string();
    if filter.level.is_some() {
        sql.push_str(" AND level = ?");
    }
    if filter.video_id.is_some() {
        sql.push_str(" AND video_id = ?");
    }
    sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");

    let mut query = sqlx::query_as::<_, LogRow>(&sql);
    if let Some(level) = &filter.level {
        query = query.bind(level);
    }
    if let Some(video_id) = filter.video_id {
        query = query.bind(video_id);
    }
    query = query.bind(filter.limit);

    Ok(query.fetch_all(pool).await?)
}

/// Delete log rows older than `days` days. Returns the number deleted.
pub async fn cleanup_older_than(pool: &SqlitePool, days: i64) -> Result<u64> {
    let affected = sqlx::query(
        "DELETE FROM logs WHERE timestamp < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ? || ' days')",
    )
    .bind(format!("-{days}"))
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected)
}
