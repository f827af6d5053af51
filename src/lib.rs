//! transcript-harvester
//!
//! Durable, crash-recoverable, multi-worker job-queue engine that
//! ingests channel listings and drives per-video transcript
//! extraction through a flaky external adapter.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use services::extractor::TranscriptExtractor;
use services::ingestor::Ingestor;
use services::logger::Logger;
use services::queue_manager::QueueManager;
use services::worker_pool::WorkerPool;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state handed to every handler as `web::Data<AppState>`.
pub struct AppState {
    pub pool: SqlitePool,
    pub logger: Logger,
    pub queue: QueueManager,
    pub ingestor: Ingestor,
    pub worker_pool: Mutex<WorkerPool>,
}

impl AppState {
    pub fn new(pool: SqlitePool, extractor: Arc<dyn TranscriptExtractor>) -> Self {
        let logger = Logger::new(pool.clone());
        let queue = QueueManager::new(pool.clone(), logger.clone());
        let ingestor = Ingestor::new(pool.clone(), logger.clone(), extractor.clone());
        let worker_pool = WorkerPool::new(pool.clone(), logger.clone(), queue.clone(), extractor);

        Self {
            pool,
            logger,
            queue,
            ingestor,
            worker_pool: Mutex::new(worker_pool),
        }
    }

    /// Startup recovery: always executed before any
    /// worker is launched.
    ///   1. reset_processing() — every `processing` row -> `pending`.
    ///   2. reset attempts=0 for every `pending|processing` row.
    ///   3. reconcile() — elevate to `completed` any row with a Subtitle.
    pub async fn run_startup_recovery(&self) -> Result<()> {
        let reset = self.queue.reset_processing().await?;
        let reset_attempts = self.queue.reset_attempts().await?;
        let completed = self.queue.reconcile().await?;
        tracing::info!(
            reset_processing = reset,
            reset_attempts = reset_attempts,
            reconciled_completed = completed,
            "startup recovery complete"
        );
        Ok(())
    }
}
