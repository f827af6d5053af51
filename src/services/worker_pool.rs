//! Worker pool.
//!
//! N concurrent workers loop: claim -> fetch transcript -> persist ->
//! release, honoring the global stop signal and per-video retry +
//! backoff. Uses a `tokio::sync::watch<bool>` checked on every loop
//! iteration for shutdown, with the pool kept in-process so the control
//! plane can start/stop/restart it without a separate binary.
use crate::db::{setting_repo, subtitle_repo, video_repo};
use crate::services::classifier::{classify, FailureClass};
use crate::services::extractor::TranscriptExtractor;
use crate::services::logger::Logger;
use crate::services::queue_manager::{QueueManager, ReleaseOutcome};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const IDLE_POLL: Duration = Duration::from_secs(1);
const MAX_BACKOFF_SECS: f64 = 300.0;
const SHUTDOWN_BUDGET: Duration = Duration::from_secs(30);

/// Per-worker live status.
pub struct WorkerStatus {
    pub id: usize,
    pub processed: Arc<AtomicU64>,
    pub failed: Arc<AtomicU64>,
    pub current_video_id: Arc<AtomicI64>,
    pub started_at: DateTime<Utc>,
}

impl WorkerStatus {
    fn new(id: usize) -> Self {
        Self {
            id,
            processed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            current_video_id: Arc::new(AtomicI64::new(0)),
            started_at: Utc::now(),
        }
    }

    pub fn current_video_id(&self) -> Option<i64> {
        let v = self.current_video_id.load(Ordering::Relaxed);
        if v == 0 {
            None
        } else {
            Some(v)
        }
    }
}

struct RunningWorker {
    status: Arc<WorkerStatus>,
    handle: JoinHandle<()>,
}

pub struct WorkerPool {
    pool: SqlitePool,
    logger: Logger,
    queue: QueueManager,
    extractor: Arc<dyn TranscriptExtractor>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    workers: Vec<RunningWorker>,
}

impl WorkerPool {
    pub fn new(
        pool: SqlitePool,
        logger: Logger,
        queue: QueueManager,
        extractor: Arc<dyn TranscriptExtractor>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            pool,
            logger,
            queue,
            extractor,
            stop_tx,
            stop_rx,
            workers: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn statuses(&self) -> Vec<Arc<WorkerStatus>> {
        self.workers.iter().map(|w| w.status.clone()).collect()
    }

    /// Spawn `n` workers. If `n` is `None`, read `Setting.max_workers`.
    pub async fn start(&mut self, n: Option<i64>) -> crate::error::Result<usize> {
        if self.is_running() {
            return Ok(self.num_workers());
        }

        let n = match n {
            Some(n) => n,
            None => setting_repo::get(&self.pool).await?.max_workers,
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        self.stop_tx = stop_tx;
        self.stop_rx = stop_rx;

        for id in 0..n as usize {
            let status = Arc::new(WorkerStatus::new(id));
            let handle = spawn_worker(
                id,
                self.pool.clone(),
                self.logger.clone(),
                self.queue.clone(),
                self.extractor.clone(),
                self.stop_rx.clone(),
                status.clone(),
            );
            self.workers.push(RunningWorker { status, handle });
        }

        self.logger.info(&format!("worker pool started with {n} workers"), None).await;
        Ok(self.workers.len())
    }

    /// Signal all workers to stop and wait up to the shutdown budget.
    /// Remaining `processing` rows are left for the next startup's
    /// `reset_processing`.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        let handles: Vec<JoinHandle<()>> = self.workers.drain(..).map(|w| w.handle).collect();

        let joined = tokio::time::timeout(SHUTDOWN_BUDGET, futures_join_all(handles)).await;
        if joined.is_err() {
            self.logger
                .warn("worker shutdown exceeded 30s budget; remaining processing rows recovered on next startup", None)
                .await;
        }
    }

    pub async fn restart(&mut self, n: Option<i64>) -> crate::error::Result<usize> {
        self.stop().await;
        self.start(n).await
    }
}

/// Minimal join-all so this module doesn't need a `futures` dependency
/// solely for this one call site.
async fn futures_join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_worker(
    id: usize,
    pool: SqlitePool,
    logger: Logger,
    queue: QueueManager,
    extractor: Arc<dyn TranscriptExtractor>,
    mut stop_rx: watch::Receiver<bool>,
    status: Arc<WorkerStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *stop_rx.borrow() {
                break;
            }

            let claimed = match queue.claim_next().await {
                Ok(v) => v,
                Err(err) => {
                    logger.log_exception(&err, None).await;
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                }
            };

            let Some(video_id) = claimed else {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                    _ = stop_rx.changed() => {}
                }
                continue;
            };

            status.current_video_id.store(video_id, Ordering::Relaxed);

            let attempts_after = process_one(&pool, &logger, &queue, extractor.as_ref(), video_id).await;

            status.current_video_id.store(0, Ordering::Relaxed);

            match attempts_after {
                WorkerOutcome::Completed => {
                    status.processed.fetch_add(1, Ordering::Relaxed);
                }
                WorkerOutcome::FailedWithBackoff(attempts) => {
                    status.failed.fetch_add(1, Ordering::Relaxed);
                    let backoff_factor = setting_repo::get(&pool)
                        .await
                        .map(|s| s.backoff_factor)
                        .unwrap_or(2.0);
                    let delay = backoff_factor.powi(attempts as i32).min(MAX_BACKOFF_SECS);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
                        _ = stop_rx.changed() => {}
                    }
                }
                WorkerOutcome::FailedTerminal => {
                    status.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        logger.info(&format!("worker {id} stopped"), None).await;
    })
}

enum WorkerOutcome {
    Completed,
    /// Transient failure that was re-queued; carries `attempts` for the
    /// caller's backoff sleep.
    FailedWithBackoff(i64),
    /// Permanent failure or transient failure that exhausted retries.
    FailedTerminal,
}

/// One claimed video through to completion: fetch details, call the
/// extractor without holding a store handle, persist on success, and
/// classify + release on failure.
async fn process_one(
    pool: &SqlitePool,
    logger: &Logger,
    queue: &QueueManager,
    extractor: &dyn TranscriptExtractor,
    video_id: i64,
) -> WorkerOutcome {
    let video = match video_repo::get_by_id(pool, video_id).await {
        Ok(Some(v)) => v,
        Ok(None) => {
            logger.error(&format!("claimed video {video_id} not found"), Some(video_id)).await;
            return WorkerOutcome::FailedTerminal;
        }
        Err(err) => {
            logger.log_exception(&err, Some(video_id)).await;
            return WorkerOutcome::FailedTerminal;
        }
    };

    // No store handle is held across this network call.
    let result = extractor
        .fetch_transcript(&video.url, &["en".to_string()], true)
        .await;

    match result {
        Ok(transcript) => {
            if let Err(err) =
                subtitle_repo::upsert(pool, video_id, &transcript.language, &transcript.content).await
            {
                logger.log_exception(&err, Some(video_id)).await;
                let _ = queue
                    .release(video_id, ReleaseOutcome::FailedTransient(err.to_string()))
                    .await;
                return WorkerOutcome::FailedTerminal;
            }
            match queue.release(video_id, ReleaseOutcome::Completed).await {
                Ok(_) => WorkerOutcome::Completed,
                Err(err) => {
                    logger.log_exception(&err, Some(video_id)).await;
                    WorkerOutcome::FailedTerminal
                }
            }
        }
        Err(message) => match classify(&message) {
            FailureClass::Transient => {
                match queue.release(video_id, ReleaseOutcome::FailedTransient(message)).await {
                    Ok(attempts) => WorkerOutcome::FailedWithBackoff(attempts),
                    Err(err) => {
                        logger.log_exception(&err, Some(video_id)).await;
                        WorkerOutcome::FailedTerminal
                    }
                }
            }
            FailureClass::Permanent => {
                let _ = queue.release(video_id, ReleaseOutcome::FailedPermanent(message)).await;
                WorkerOutcome::FailedTerminal
            }
        },
    }
}
