//! Job handlers - HTTP endpoints for queue/worker lifecycle and settings.
use crate::db::{log_repo, setting_repo};
use crate::error::{AppError, Result};
use crate::models::{
    CleanupQuery, JobActionResponse, JobStatusResponse, LogQuery, ReconcileResponse, Setting,
    UpdateSettingsRequest, WorkerActionRequest, WorkerPoolStatusResponse, WorkerStatusSummary,
};
use crate::AppState;
use actix_web::{web, HttpResponse};
use std::sync::atomic::Ordering;

/// GET /jobs/status
pub async fn job_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    let job = setting_repo::get_job(&state.pool).await?;
    let queue_stats = state.queue.stats().await?;
    Ok(HttpResponse::Ok().json(JobStatusResponse {
        status: job.status,
        active_workers: job.active_workers,
        queue_stats,
        started_at: job.started_at,
        stopped_at: job.stopped_at,
    }))
}

async fn set_job_and_respond(
    state: &AppState,
    status: &str,
    active_workers: i64,
    touch_started: bool,
    touch_stopped: bool,
    message: &str,
) -> Result<HttpResponse> {
    setting_repo::set_job_status(&state.pool, status, active_workers, touch_started, touch_stopped).await?;
    let queue_stats = state.queue.stats().await?;
    Ok(HttpResponse::Ok().json(JobActionResponse {
        message: message.to_string(),
        status: status.to_string(),
        queue_stats,
    }))
}

/// POST /jobs/start
pub async fn start_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    let n = {
        let mut pool = state.worker_pool.lock().await;
        pool.start(None).await?
    };
    set_job_and_respond(&state, "running", n as i64, true, false, "job started").await
}

/// POST /jobs/pause
pub async fn pause_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    {
        let mut pool = state.worker_pool.lock().await;
        pool.stop().await;
    }
    set_job_and_respond(&state, "paused", 0, false, false, "job paused").await
}

/// POST /jobs/resume
pub async fn resume_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    let n = {
        let mut pool = state.worker_pool.lock().await;
        pool.start(None).await?
    };
    set_job_and_respond(&state, "running", n as i64, false, false, "job resumed").await
}

/// POST /jobs/stop
pub async fn stop_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    {
        let mut pool = state.worker_pool.lock().await;
        pool.stop().await;
    }
    // Operator stop also forces a reset of stuck `processing` rows,
    // same as startup recovery.
    state.queue.reset_processing().await?;
    set_job_and_respond(&state, "idle", 0, false, true, "job stopped").await
}

/// POST /jobs/reconcile
pub async fn reconcile_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    let completed_videos = state.queue.reconcile().await?;
    let reset_videos = state.queue.reset_processing().await?;
    Ok(HttpResponse::Ok().json(ReconcileResponse {
        message: "reconciliation complete".to_string(),
        completed_videos,
        reset_videos,
    }))
}

/// GET /jobs/settings
pub async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse> {
    let settings = setting_repo::get(&state.pool).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// POST /jobs/settings
pub async fn update_settings(
    state: web::Data<AppState>,
    body: web::Json<UpdateSettingsRequest>,
) -> Result<HttpResponse> {
    let req = body.into_inner();
    let settings: Setting = setting_repo::update(
        &state.pool,
        req.max_workers,
        req.max_retries,
        req.backoff_factor,
        &req.output_dir,
    )
    .await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// POST /jobs/cleanup?days=
pub async fn cleanup_logs(
    state: web::Data<AppState>,
    query: web::Query<CleanupQuery>,
) -> Result<HttpResponse> {
    let days = query.days.unwrap_or(30);
    if !(1..=365).contains(&days) {
        return Err(AppError::Validation("days must be in 1..=365".into()));
    }
    let deleted = log_repo::cleanup_older_than(&state.pool, days).await?;
    Ok(HttpResponse::Ok().json(deleted))
}

/// GET /jobs/logs
pub async fn list_logs(state: web::Data<AppState>, query: web::Query<LogQuery>) -> Result<HttpResponse> {
    let filter = log_repo::LogFilter {
        level: query.level.clone(),
        video_id: query.video_id,
        limit: query.limit.unwrap_or(100),
    };
    let logs = log_repo::list(&state.pool, &filter).await?;
    Ok(HttpResponse::Ok().json(logs))
}

async fn worker_status_response(state: &AppState) -> Result<WorkerPoolStatusResponse> {
    let pool = state.worker_pool.lock().await;
    let statuses = pool.statuses();
    let running = pool.is_running();
    let num_workers = pool.num_workers();

    let mut total_processed = 0u64;
    let mut total_failed = 0u64;
    let mut active_workers = 0usize;
    let mut workers = Vec::with_capacity(statuses.len());

    for status in &statuses {
        let processed = status.processed.load(Ordering::Relaxed);
        let failed = status.failed.load(Ordering::Relaxed);
        let current_video_id = status.current_video_id();
        if current_video_id.is_some() {
            active_workers += 1;
        }
        total_processed += processed;
        total_failed += failed;
        workers.push(WorkerStatusSummary {
            id: status.id,
            processed,
            failed,
            running,
            current_video_id,
            started_at: status.started_at,
        });
    }

    let queue_stats = state.queue.stats().await?;

    Ok(WorkerPoolStatusResponse {
        running,
        num_workers,
        active_workers,
        total_processed,
        total_failed,
        workers,
        queue_stats,
    })
}

/// GET /jobs/workers/status
pub async fn workers_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(worker_status_response(&state).await?))
}

/// POST /jobs/workers/start
pub async fn workers_start(
    state: web::Data<AppState>,
    body: web::Json<WorkerActionRequest>,
) -> Result<HttpResponse> {
    {
        let mut pool = state.worker_pool.lock().await;
        pool.start(body.num_workers).await?;
    }
    Ok(HttpResponse::Ok().json(worker_status_response(&state).await?))
}

/// POST /jobs/workers/stop
pub async fn workers_stop(state: web::Data<AppState>) -> Result<HttpResponse> {
    {
        let mut pool = state.worker_pool.lock().await;
        pool.stop().await;
    }
    state.queue.reset_processing().await?;
    Ok(HttpResponse::Ok().json(worker_status_response(&state).await?))
}

/// POST /jobs/workers/restart
pub async fn workers_restart(
    state: web::Data<AppState>,
    body: web::Json<WorkerActionRequest>,
) -> Result<HttpResponse> {
    {
        let mut pool = state.worker_pool.lock().await;
        pool.restart(body.num_workers).await?;
    }
    state.queue.reset_processing().await?;
    Ok(HttpResponse::Ok().json(worker_status_response(&state).await?))
}
