//! HTTP handlers for the control plane.
//!
//! Each handler is a thin translator onto the service layer; none
//! duplicate queue-state logic.
pub mod channels;
pub mod jobs;
pub mod videos;

pub use channels::{
    create_channels, delete_channel, get_channel, ingestion_status, list_channel_videos,
    list_channels,
};

pub use videos::{delete_video, get_video, list_videos, queue_failed, queue_stats, retry_video};

pub use jobs::{
    cleanup_logs, get_settings, job_status, list_logs, pause_job, reconcile_job, resume_job,
    start_job, stop_job, update_settings, workers_restart, workers_start, workers_status,
    workers_stop,
};
