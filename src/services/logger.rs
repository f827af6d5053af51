//! Centralized logging sink.
//!
//! Every call duplicates to the process log stream and an append-only
//! `logs` row; a row-insert failure degrades to a stream line and never
//! propagates — logging must never throw upward.
use crate::db::log_repo;
use crate::models::{LOG_ERROR, LOG_INFO, LOG_WARN, MAX_LOG_MESSAGE_BYTES};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Logger {
    pool: SqlitePool,
}

fn truncate_trailing(message: &str, max_bytes: usize) -> String {
    if message.len() <= max_bytes {
        return message.to_string();
    }
    let start = message.len() - max_bytes;
    // Avoid splitting a multi-byte UTF-8 sequence.
    let mut start = start;
    while !message.is_char_boundary(start) {
        start += 1;
    }
    message[start..].to_string()
}

impl Logger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, level: &str, message: &str, video_id: Option<i64>) {
        match level {
            LOG_ERROR => tracing::error!(video_id = ?video_id, "{message}"),
            LOG_WARN => tracing::warn!(video_id = ?video_id, "{message}"),
            _ => tracing::info!(video_id = ?video_id, "{message}"),
        }

        let truncated = truncate_trailing(message, MAX_LOG_MESSAGE_BYTES);
        if let Err(err) = log_repo::insert(&self.pool, level, &truncated, video_id).await {
            tracing::error!(error = %err, "failed to persist log row; stream log above is authoritative");
        }
    }

    pub async fn info(&self, message: &str, video_id: Option<i64>) {
        self.log(LOG_INFO, message, video_id).await;
    }

    pub async fn warn(&self, message: &str, video_id: Option<i64>) {
        self.log(LOG_WARN, message, video_id).await;
    }

    pub async fn error(&self, message: &str, video_id: Option<i64>) {
        self.log(LOG_ERROR, message, video_id).await;
    }

    /// Format a chained error's message as a pseudo stack trace and log
    /// it at ERROR, truncated the same way as any other message.
    pub async fn log_exception(
        &self,
        err: &(dyn std::error::Error + Send + Sync),
        video_id: Option<i64>,
    ) {
        let mut trace = err.to_string();
        let mut source = err.source();
        while let Some(s) = source {
            trace.push_str("\ncaused by: ");
            trace.push_str(&s.to_string());
            source = s.source();
        }
        self.error(&trace, video_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_trailing_bytes() {
        let long = "a".repeat(MAX_LOG_MESSAGE_BYTES + 100);
        let truncated = truncate_trailing(&long, MAX_LOG_MESSAGE_BYTES);
        assert_eq!(truncated.len(), MAX_LOG_MESSAGE_BYTES);
        assert!(long.ends_with(&truncated));
    }

    #[test]
    fn short_message_untouched() {
        assert_eq!(truncate_trailing("hello", MAX_LOG_MESSAGE_BYTES), "hello");
    }
}
