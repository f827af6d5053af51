//! Domain entities persisted in the store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Channel {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub total_videos: i64,
    pub ingestion_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub channel_id: i64,
    pub url: String,
    pub title: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subtitle {
    pub id: i64,
    pub video_id: i64,
    pub language: String,
    pub content: String,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub status: String,
    pub active_workers: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub id: i64,
    pub max_workers: i64,
    pub max_retries: i64,
    pub backoff_factor: f64,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogRow {
    pub id: i64,
    pub video_id: Option<i64>,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counts across the `videos` table, globally or per channel.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

/// Maximum size of `subtitles.content` in bytes.
pub const MAX_SUBTITLE_CONTENT_BYTES: usize = 2_000_000;

/// Maximum size of a `logs.message` row, truncated at the Logger boundary.
pub const MAX_LOG_MESSAGE_BYTES: usize = 4_000;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub const LOG_INFO: &str = "INFO";
pub const LOG_WARN: &str = "WARN";
pub const LOG_ERROR: &str = "ERROR";

pub const CHANNEL_NAME_LOADING: &str = "Loading";
pub const CHANNEL_NAME_FAILED: &str = "Failed";

// ========================================
// API request/response DTOs
// ========================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChannelUrlsRequest {
    Single { url: String },
    Many { urls: Vec<String> },
}

impl ChannelUrlsRequest {
    pub fn urls(self) -> Vec<String> {
        match self {
            ChannelUrlsRequest::Single { url } => vec![url],
            ChannelUrlsRequest::Many { urls } => urls,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub channels_created: i64,
    pub videos_enqueued: i64,
    pub channels_skipped: i64,
}

#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub total_videos: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Loading,
    Completed,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct IngestionStatusResponse {
    pub status: IngestionStatus,
    pub videos_found: i64,
    pub videos_ingested: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelVideosResponse {
    pub videos: Vec<Video>,
    pub total: i64,
    pub status_counts: QueueStats,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub status: Option<String>,
    pub channel_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
    pub level: Option<String>,
    pub video_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub video_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub active_workers: i64,
    pub queue_stats: QueueStats,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct JobActionResponse {
    pub message: String,
    pub status: String,
    pub queue_stats: QueueStats,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub message: String,
    pub completed_videos: u64,
    pub reset_videos: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub max_workers: i64,
    pub max_retries: i64,
    pub backoff_factor: f64,
    pub output_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerActionRequest {
    pub num_workers: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WorkerStatusSummary {
    pub id: usize,
    pub processed: u64,
    pub failed: u64,
    pub running: bool,
    pub current_video_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WorkerPoolStatusResponse {
    pub running: bool,
    pub num_workers: usize,
    pub active_workers: usize,
    pub total_processed: u64,
    pub total_failed: u64,
    pub workers: Vec<WorkerStatusSummary>,
    pub queue_stats: QueueStats,
}
