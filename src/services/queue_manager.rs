//! Queue manager.
//!
//! Atomic claim/release of videos, status reconciliation, crash
//! recovery, retry accounting. The single authoritative site for all
//! retry logic — workers only apply the inter-claim backoff sleep based
//! on the `attempts` value this module returns, so the decision of
//! whether to retry never lives in two places at once.
use crate::db::{setting_repo, subtitle_repo, video_repo};
use crate::error::Result;
use crate::models::{QueueStats, Video, LOG_ERROR, LOG_INFO, STATUS_FAILED};
use crate::services::logger::Logger;
use sqlx::SqlitePool;

/// Outcome passed to `release`.
pub enum ReleaseOutcome {
    Completed,
    Pending,
    /// A transient failure: Queue Manager re-queues unless retries are
    /// exhausted.
    FailedTransient(String),
    /// A permanent domain failure: forced to `failed` regardless of
    /// remaining retries.
    FailedPermanent(String),
}

#[derive(Clone)]
pub struct QueueManager {
    pool: SqlitePool,
    logger: Logger,
}

impl QueueManager {
    pub fn new(pool: SqlitePool, logger: Logger) -> Self {
        Self { pool, logger }
    }

    /// Atomically claim the lowest-id pending video. `None` when the
    /// queue is empty. Uses a SELECT-then-conditional-UPDATE inside one
    /// transaction so the predicate is serialized against concurrent
    /// callers, rather than trusting a read outside the transaction.
    pub async fn claim_next(&self) -> Result<Option<i64>> {
        let mut tx = self.pool.begin().await?;

        let candidate: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM videos WHERE status = 'pending' ORDER BY id LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some((video_id,)) = candidate else {
            tx.commit().await?;
            return Ok(None);
        };

        let affected = sqlx::query(
            "UPDATE videos SET status = 'processing' WHERE id = ? AND status = 'pending'",
        )
        .bind(video_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if affected == 1 {
            Ok(Some(video_id))
        } else {
            // Lost the race to another concurrent claimer.
            Ok(None)
        }
    }

    /// Release a video back to `pending`/`completed`, or apply retry
    /// accounting for a failure. Returns the video's `attempts` after
    /// the transition, which the worker uses for its backoff sleep.
    pub async fn release(&self, video_id: i64, outcome: ReleaseOutcome) -> Result<i64> {
        match outcome {
            ReleaseOutcome::Completed => {
                sqlx::query(
                    "UPDATE videos SET status = 'completed', \
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), last_error = NULL \
                     WHERE id = ?",
                )
                .bind(video_id)
                .execute(&self.pool)
                .await?;
                self.logger
                    .info(&format!("video {video_id} completed successfully"), Some(video_id))
                    .await;
                Ok(0)
            }
            ReleaseOutcome::Pending => {
                sqlx::query("UPDATE videos SET status = 'pending' WHERE id = ?")
                    .bind(video_id)
                    .execute(&self.pool)
                    .await?;
                self.current_attempts(video_id).await
            }
            ReleaseOutcome::FailedPermanent(message) => {
                let attempts = self.bump_attempts(video_id, &message).await?;
                sqlx::query("UPDATE videos SET status = 'failed' WHERE id = ?")
                    .bind(video_id)
                    .execute(&self.pool)
                    .await?;
                self.logger
                    .log(
                        LOG_ERROR,
                        &format!("video {video_id} permanently failed: {message}"),
                        Some(video_id),
                    )
                    .await;
                Ok(attempts)
            }
            ReleaseOutcome::FailedTransient(message) => {
                let attempts = self.bump_attempts(video_id, &message).await?;
                let max_retries = setting_repo::get(&self.pool).await?.max_retries;

                if attempts < max_retries {
                    sqlx::query("UPDATE videos SET status = 'pending' WHERE id = ?")
                        .bind(video_id)
                        .execute(&self.pool)
                        .await?;
                    self.logger
                        .warn(
                            &format!(
                                "video {video_id} failed, requeuing (attempt {attempts}/{max_retries}): {message}"
                            ),
                            Some(video_id),
                        )
                        .await;
                } else {
                    sqlx::query("UPDATE videos SET status = 'failed' WHERE id = ?")
                        .bind(video_id)
                        .execute(&self.pool)
                        .await?;
                    self.logger
                        .log(
                            LOG_ERROR,
                            &format!(
                                "video {video_id} permanently failed after {attempts} attempts: {message}"
                            ),
                            Some(video_id),
                        )
                        .await;
                }
                Ok(attempts)
            }
        }
    }

    async fn bump_attempts(&self, video_id: i64, message: &str) -> Result<i64> {
        sqlx::query("UPDATE videos SET attempts = attempts + 1, last_error = ? WHERE id = ?")
            .bind(message)
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        self.current_attempts(video_id).await
    }

    async fn current_attempts(&self, video_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT attempts FROM videos WHERE id = ?")
            .bind(video_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Reset every `processing` row to `pending` (crash recovery).
    pub async fn reset_processing(&self) -> Result<u64> {
        let affected = sqlx::query("UPDATE videos SET status = 'pending' WHERE status = 'processing'")
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected > 0 {
            self.logger
                .info(
                    &format!("startup recovery: reset {affected} processing videos to pending"),
                    None,
                )
                .await;
        }
        Ok(affected)
    }

    /// Reset `attempts = 0` for every `pending|processing` row. Part of
    /// startup recovery.
    pub async fn reset_attempts(&self) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE videos SET attempts = 0 WHERE status IN ('pending', 'processing')",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }

    /// Elevate any video with a Subtitle row to `completed` (idempotent).
    pub async fn reconcile(&self) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE videos SET status = 'completed', \
             completed_at = COALESCE(completed_at, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')) \
             WHERE status != 'completed' AND id IN (SELECT DISTINCT video_id FROM subtitles)",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected > 0 {
            self.logger
                .info(&format!("reconciliation: marked {affected} videos as completed"), None)
                .await;
        }
        Ok(affected)
    }

    /// Operator-initiated retry: `failed` -> `pending`, attempts reset.
    /// Any other current status is rejected.
    pub async fn retry_failed(&self, video_id: i64) -> Result<Video> {
        let video = video_repo::get_by_id(&self.pool, video_id)
            .await?
            .ok_or_else(|| crate::error::AppError::NotFound(format!("video {video_id} not found")))?;

        if video.status != STATUS_FAILED {
            return Err(crate::error::AppError::Conflict(format!(
                "video {video_id} is not failed (current status: {})",
                video.status
            )));
        }

        sqlx::query(
            "UPDATE videos SET status = 'pending', attempts = 0, last_error = NULL WHERE id = ?",
        )
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        self.logger.log(LOG_INFO, &format!("manual retry initiated for video {video_id}"), Some(video_id)).await;

        video_repo::get_by_id(&self.pool, video_id)
            .await?
            .ok_or_else(|| crate::error::AppError::Internal("video vanished after retry".into()))
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        video_repo::stats(&self.pool).await
    }

    pub async fn stats_for_channel(&self, channel_id: i64) -> Result<QueueStats> {
        video_repo::stats_for_channel(&self.pool, channel_id).await
    }

    /// Ensure I1 (completed implies a linked Subtitle) — used by the
    /// worker before marking a claim complete, as a defensive check on
    /// top of reconciliation.
    pub async fn has_subtitle(&self, video_id: i64) -> Result<bool> {
        subtitle_repo::exists_for_video(&self.pool, video_id).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_test_pool, video_repo};
    use std::collections::HashSet;

    async fn manager_with_pending(count: i64) -> QueueManager {
        let pool = init_test_pool().await;
        sqlx::query("INSERT INTO channels (url, name) VALUES ('https://video.example/@t', 'T')")
            .execute(&pool)
            .await
            .unwrap();
        for i in 0..count {
            sqlx::query("INSERT INTO videos (channel_id, url, title) VALUES (1, ?, ?)")
                .bind(format!("https://video.example/watch?v={i}"))
                .bind(format!("video {i}"))
                .execute(&pool)
                .await
                .unwrap();
        }
        QueueManager::new(pool.clone(), Logger::new(pool))
    }

    /// Concurrent claimers never both receive the same id.
    #[tokio::test]
    async fn concurrent_claims_never_duplicate() {
        let manager = manager_with_pending(20).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(id) = manager.claim_next().await.unwrap() {
                    claimed.push(id);
                }
                claimed
            }));
        }

        let mut all_claimed = Vec::new();
        for handle in handles {
            all_claimed.extend(handle.await.unwrap());
        }

        let unique: HashSet<i64> = all_claimed.iter().copied().collect();
        assert_eq!(unique.len(), all_claimed.len(), "no id claimed twice");
        assert_eq!(unique.len(), 20, "every pending row was claimed exactly once");
    }

    /// FIFO among pending rows when claims are serialized.
    #[tokio::test]
    async fn claims_are_fifo_among_pending() {
        let manager = manager_with_pending(5).await;
        let mut order = Vec::new();
        while let Some(id) = manager.claim_next().await.unwrap() {
            order.push(id);
        }
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted, "claims must come out in ascending id order");
    }

    /// A video reaches terminal `failed` after exactly max_retries
    /// transient failures, never earlier.
    #[tokio::test]
    async fn transient_failures_respect_retry_bound() {
        let manager = manager_with_pending(1).await;
        setting_repo::update(manager.pool(), 4, 2, 2.0, "data").await.unwrap();

        let video_id = manager.claim_next().await.unwrap().unwrap();
        let attempts = manager.release(video_id, ReleaseOutcome::FailedTransient("timeout".into())).await.unwrap();
        assert_eq!(attempts, 1);
        let video = video_repo::get_by_id(manager.pool(), video_id).await.unwrap().unwrap();
        assert_eq!(video.status, "pending");

        let video_id = manager.claim_next().await.unwrap().unwrap();
        let attempts = manager.release(video_id, ReleaseOutcome::FailedTransient("timeout".into())).await.unwrap();
        assert_eq!(attempts, 2);
        let video = video_repo::get_by_id(manager.pool(), video_id).await.unwrap().unwrap();
        assert_eq!(video.status, "failed");
    }

    /// A permanent failure is terminal immediately, regardless of attempts.
    #[tokio::test]
    async fn permanent_failure_is_immediate() {
        let manager = manager_with_pending(1).await;
        let video_id = manager.claim_next().await.unwrap().unwrap();
        manager
            .release(video_id, ReleaseOutcome::FailedPermanent("private video".into()))
            .await
            .unwrap();
        let video = video_repo::get_by_id(manager.pool(), video_id).await.unwrap().unwrap();
        assert_eq!(video.status, "failed");
        assert_eq!(video.attempts, 1);
    }

    /// Crash recovery resets `processing` rows to `pending` with attempts=0.
    #[tokio::test]
    async fn crash_recovery_resets_processing_rows() {
        let manager = manager_with_pending(3).await;
        let video_id = manager.claim_next().await.unwrap().unwrap();
        sqlx::query("UPDATE videos SET attempts = 2 WHERE id = ?")
            .bind(video_id)
            .execute(manager.pool())
            .await
            .unwrap();

        manager.reset_processing().await.unwrap();
        manager.reset_attempts().await.unwrap();

        let video = video_repo::get_by_id(manager.pool(), video_id).await.unwrap().unwrap();
        assert_eq!(video.status, "pending");
        assert_eq!(video.attempts, 0);
    }

    /// Reconcile is idempotent.
    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let manager = manager_with_pending(1).await;
        let video_id = manager.claim_next().await.unwrap().unwrap();
        sqlx::query("INSERT INTO subtitles (video_id, language, content) VALUES (?, 'en', 'hi')")
            .bind(video_id)
            .execute(manager.pool())
            .await
            .unwrap();

        let first = manager.reconcile().await.unwrap();
        let second = manager.reconcile().await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0, "second reconcile has nothing left to do");

        let video = video_repo::get_by_id(manager.pool(), video_id).await.unwrap().unwrap();
        assert_eq!(video.status, "completed");
    }

    /// A completed row always has a linked subtitle after reconciliation.
    #[tokio::test]
    async fn no_completion_without_subtitle() {
        let manager = manager_with_pending(2).await;
        // Video 1 gets a subtitle and should reconcile to completed.
        sqlx::query("INSERT INTO subtitles (video_id, language, content) VALUES (1, 'en', 'hi')")
            .execute(manager.pool())
            .await
            .unwrap();
        manager.reconcile().await.unwrap();

        let videos = video_repo::list(
            manager.pool(),
            &video_repo::VideoFilter { limit: 100, ..Default::default() },
        )
        .await
        .unwrap();

        for video in videos {
            if video.status == "completed" {
                assert!(manager.has_subtitle(video.id).await.unwrap());
            }
        }
    }

    /// Retry is rejected on any status but `failed`; succeeds on `failed`.
    #[tokio::test]
    async fn retry_only_allowed_from_failed() {
        let manager = manager_with_pending(1).await;
        let video_id = 1;

        // Still pending: reject.
        assert!(manager.retry_failed(video_id).await.is_err());

        manager.claim_next().await.unwrap();
        manager
            .release(video_id, ReleaseOutcome::FailedPermanent("not found".into()))
            .await
            .unwrap();

        let video = manager.retry_failed(video_id).await.unwrap();
        assert_eq!(video.status, "pending");
        assert_eq!(video.attempts, 0);
    }
}
