//! Video handlers - HTTP endpoints for video inspection and retry.
use crate::db::video_repo::{self, VideoFilter};
use crate::error::{AppError, Result};
use crate::models::{RetryResponse, VideoQuery};
use crate::AppState;
use actix_web::{web, HttpResponse};

/// GET /videos
pub async fn list_videos(state: web::Data<AppState>, query: web::Query<VideoQuery>) -> Result<HttpResponse> {
    let filter = VideoFilter {
        status: query.status.clone(),
        channel_id: query.channel_id,
        limit: query.limit.unwrap_or(100),
        offset: query.offset.unwrap_or(0),
    };
    let videos = video_repo::list(&state.pool, &filter).await?;
    Ok(HttpResponse::Ok().json(videos))
}

/// GET /videos/{id}
pub async fn get_video(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let video = video_repo::get_by_id(&state.pool, *id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {} not found", *id)))?;
    Ok(HttpResponse::Ok().json(video))
}

/// POST /videos/{id}/retry
pub async fn retry_video(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let video = state.queue.retry_failed(*id).await?;
    Ok(HttpResponse::Ok().json(RetryResponse {
        video_id: video.id,
        status: video.status,
    }))
}

/// DELETE /videos/{id}
pub async fn delete_video(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let deleted = video_repo::delete(&state.pool, *id).await?;
    if deleted {
        Ok(HttpResponse::Ok().finish())
    } else {
        Err(AppError::NotFound(format!("video {} not found", *id)))
    }
}

/// GET /videos/queue/stats
pub async fn queue_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let stats = state.queue.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(serde::Deserialize)]
pub struct FailedQuery {
    pub limit: Option<i64>,
}

/// GET /videos/queue/failed
pub async fn queue_failed(
    state: web::Data<AppState>,
    query: web::Query<FailedQuery>,
) -> Result<HttpResponse> {
    let videos = video_repo::list_failed(&state.pool, query.limit.unwrap_or(100)).await?;
    Ok(HttpResponse::Ok().json(videos))
}
