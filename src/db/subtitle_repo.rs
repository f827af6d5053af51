//! Subtitle repository - database operations for transcripts.
use crate::error::{AppError, Result};
use crate::models::{Subtitle, MAX_SUBTITLE_CONTENT_BYTES};
use sqlx::SqlitePool;

/// Insert or overwrite the subtitle for `(video_id, language)`;
/// re-extraction overwrites existing content rather than duplicating it.
pub async fn upsert(
    pool: &SqlitePool,
    video_id: i64,
    language: &str,
    content: &str,
) -> Result<Subtitle> {
    if content.len() > MAX_SUBTITLE_CONTENT_BYTES {
        return Err(AppError::Validation(format!(
            "subtitle content exceeds maximum size of {MAX_SUBTITLE_CONTENT_BYTES} bytes"
        )));
    }

    sqlx::query(
        "INSERT INTO subtitles (video_id, language, content, downloaded_at) \
         VALUES (?, ?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')) \
         ON CONFLICT(video_id, language) DO UPDATE SET \
            content = excluded.content, downloaded_at = excluded.downloaded_at",
    )
    .bind(video_id)
    .bind(language)
    .bind(content)
    .execute(pool)
    .await?;

    let subtitle = sqlx::query_as::<_, Subtitle>(
        "SELECT id, video_id, language, content, downloaded_at FROM subtitles \
         WHERE video_id = ? AND language = ?",
    )
    .bind(video_id)
    .bind(language)
    .fetch_one(pool)
    .await?;
    Ok(subtitle)
}

pub async fn exists_for_video(pool: &SqlitePool, video_id: i64) -> Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subtitles WHERE video_id = ?")
        .bind(video_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}
