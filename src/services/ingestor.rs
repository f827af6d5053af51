//! Ingestor
//!
//! Validates and normalizes channel URLs, upserts the Channel row, and
//! spawns a detached enumeration task per channel so the HTTP request
//! that triggered it returns immediately.
use crate::db::channel_repo;
use crate::error::{AppError, Result};
use crate::models::{Channel, CHANNEL_NAME_FAILED, CHANNEL_NAME_LOADING};
use crate::services::extractor::TranscriptExtractor;
use crate::services::logger::Logger;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const CANONICAL_HOST: &str = "video.example";
const BATCH_COMMIT_SIZE: usize = 100;

pub struct IngestResult {
    pub channel: Channel,
    pub created: bool,
}

#[derive(Clone)]
pub struct Ingestor {
    pool: SqlitePool,
    logger: Logger,
    extractor: Arc<dyn TranscriptExtractor>,
    /// Per-channel "ingestion active" guard: rejects a second concurrent
    /// ingestion of the same channel rather than letting it race the first.
    active: Arc<Mutex<HashSet<i64>>>,
}

impl Ingestor {
    pub fn new(pool: SqlitePool, logger: Logger, extractor: Arc<dyn TranscriptExtractor>) -> Self {
        Self {
            pool,
            logger,
            extractor,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Validate a channel-URL shape.
    fn validate(url: &str) -> Result<()> {
        let path = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(url)
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or("");
        let path = format!("/{path}");

        let is_playlist = url.contains("playlist");
        let shape_ok = path.starts_with("/c/")
            || path.starts_with("/channel/")
            || path.starts_with("/user/")
            || path.starts_with("/@")
            || is_playlist;

        if shape_ok {
            Ok(())
        } else {
            Err(AppError::Validation(format!("not a recognized channel URL: {url}")))
        }
    }

    /// Normalize scheme/host.
    fn normalize(url: &str) -> String {
        let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
        let rest = rest
            .trim_start_matches("www.")
            .trim_start_matches("m.");
        let (_host, path) = rest.split_once('/').unwrap_or((rest, ""));
        format!("https://{CANONICAL_HOST}/{path}")
    }

    /// Validate, normalize, and upsert the channel, then return
    /// immediately. The detached enumeration task is spawned separately by
    /// the caller via `spawn_enumeration`, so ingestion survives the HTTP
    /// request that triggered it.
    pub async fn ingest_one(&self, raw_url: &str) -> Result<IngestResult> {
        Self::validate(raw_url)?;
        let url = Self::normalize(raw_url);

        if let Some(existing) = channel_repo::get_by_url(&self.pool, &url).await? {
            return Ok(IngestResult { channel: existing, created: false });
        }

        let channel = channel_repo::create(&self.pool, &url, CHANNEL_NAME_LOADING).await?;
        Ok(IngestResult { channel, created: true })
    }

    /// Spawn the detached per-channel enumeration task. The ingestor
    /// must not hold a store connection across the extractor call; each
    /// iteration opens a connection only to commit.
    pub fn spawn_enumeration(&self, channel_id: i64) {
        let active = self.active.clone();
        {
            let mut guard = active.lock().expect("ingestion guard poisoned");
            if !guard.insert(channel_id) {
                // Already ingesting this channel; the caller is expected
                // to have rejected this before spawning, but guard against a
                // race anyway.
                return;
            }
        }

        let pool = self.pool.clone();
        let logger = self.logger.clone();
        let extractor = self.extractor.clone();

        tokio::spawn(async move {
            let result = Self::run_enumeration(&pool, &logger, extractor.as_ref(), channel_id).await;
            if let Err(err) = result {
                let _ = channel_repo::set_name(&pool, channel_id, CHANNEL_NAME_FAILED).await;
                logger
                    .error(&format!("channel {channel_id} ingestion failed: {err}"), None)
                    .await;
            }
            let _ = channel_repo::mark_ingestion_completed(&pool, channel_id).await;
            active.lock().expect("ingestion guard poisoned").remove(&channel_id);
        });
    }

    /// True while a detached enumeration task for `channel_id` is in
    /// flight; the control plane uses this to reject concurrent
    /// ingestion requests for the same channel with 409 Conflict.
    pub fn is_active(&self, channel_id: i64) -> bool {
        self.active.lock().expect("ingestion guard poisoned").contains(&channel_id)
    }

    async fn run_enumeration(
        pool: &SqlitePool,
        logger: &Logger,
        extractor: &dyn TranscriptExtractor,
        channel_id: i64,
    ) -> Result<()> {
        let channel = channel_repo::get_by_id(pool, channel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("channel {channel_id} vanished")))?;

        let listing = extractor
            .list_channel(&channel.url)
            .await
            .map_err(AppError::Internal)?;

        if let Some(title) = listing.channel_title {
            channel_repo::set_name(pool, channel_id, &title).await?;
        }

        // Commit every BATCH_COMMIT_SIZE inserts rather than holding one
        // transaction open across the whole enumeration, which could span
        // thousands of videos on a large channel.
        let mut tx = pool.begin().await?;
        let mut inserted_since_commit = 0usize;
        for entry in &listing.videos {
            let video_url = entry
                .webpage_url
                .clone()
                .or_else(|| entry.url.clone())
                .or_else(|| {
                    entry
                        .id
                        .as_ref()
                        .map(|id| format!("https://{CANONICAL_HOST}/watch?v={id}"))
                })
                .ok_or_else(|| AppError::Internal("video entry has no derivable URL".to_string()))?;

            let title = entry.title.clone().unwrap_or_default();

            if crate::db::video_repo::insert_if_new(&mut tx, channel_id, &video_url, &title)
                .await?
                .is_some()
            {
                inserted_since_commit += 1;
                if inserted_since_commit >= BATCH_COMMIT_SIZE {
                    tx.commit().await?;
                    tx = pool.begin().await?;
                    inserted_since_commit = 0;
                }
            }
        }
        tx.commit().await?;

        let total = channel_repo::count_videos(pool, channel_id).await?;
        channel_repo::set_total_videos(pool, channel_id, total).await?;

        logger
            .info(
                &format!("channel {channel_id} ingestion complete: {total} videos"),
                None,
            )
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_recognized_shapes() {
        assert!(Ingestor::validate("https://video.example/@acme").is_ok());
        assert!(Ingestor::validate("https://video.example/channel/abc123").is_ok());
        assert!(Ingestor::validate("https://video.example/c/somechannel").is_ok());
        assert!(Ingestor::validate("https://video.example/user/legacyname").is_ok());
        assert!(Ingestor::validate("https://video.example/playlist?list=xyz").is_ok());
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        assert!(Ingestor::validate("https://video.example/watch?v=abc").is_err());
        assert!(Ingestor::validate("not a url at all").is_err());
    }

    #[test]
    fn normalizes_scheme_and_host() {
        assert_eq!(
            Ingestor::normalize("http://www.video.example/@Acme"),
            "https://video.example/@Acme"
        );
        assert_eq!(
            Ingestor::normalize("https://m.video.example/@Acme"),
            "https://video.example/@Acme"
        );
    }
}
