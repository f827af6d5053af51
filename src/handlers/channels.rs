//! Channel handlers - HTTP endpoints for channel ingestion and inspection.
use crate::db::channel_repo;
use crate::error::{AppError, Result};
use crate::models::{
    ChannelSummary, ChannelUrlsRequest, ChannelVideosResponse, IngestResponse, IngestionStatus,
    IngestionStatusResponse,
};
use crate::AppState;
use actix_web::{web, HttpResponse};

/// POST /channels
pub async fn create_channels(
    state: web::Data<AppState>,
    body: web::Json<ChannelUrlsRequest>,
) -> Result<HttpResponse> {
    let urls = body.into_inner().urls();
    if urls.is_empty() {
        return Err(AppError::Validation("at least one url is required".into()));
    }

    let mut channels_created = 0i64;
    let mut channels_skipped = 0i64;

    for url in urls {
        let outcome = state.ingestor.ingest_one(&url).await?;
        if outcome.created {
            channels_created += 1;
            state.ingestor.spawn_enumeration(outcome.channel.id);
        } else {
            channels_skipped += 1;
        }
    }

    Ok(HttpResponse::Ok().json(IngestResponse {
        channels_created,
        // Enumeration runs detached after this response is sent, so the
        // real count isn't known yet; callers poll ingestion-status instead.
        videos_enqueued: 0,
        channels_skipped,
    }))
}

async fn summarize(state: &AppState, channel: crate::models::Channel) -> Result<ChannelSummary> {
    let stats = state.queue.stats_for_channel(channel.id).await?;
    Ok(ChannelSummary {
        id: channel.id,
        url: channel.url,
        name: channel.name,
        total_videos: channel.total_videos,
        pending: stats.pending,
        processing: stats.processing,
        completed: stats.completed,
        failed: stats.failed,
        created_at: channel.created_at,
    })
}

/// GET /channels
pub async fn list_channels(state: web::Data<AppState>) -> Result<HttpResponse> {
    let channels = channel_repo::list_all(&state.pool).await?;
    let mut summaries = Vec::with_capacity(channels.len());
    for channel in channels {
        summaries.push(summarize(&state, channel).await?);
    }
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /channels/{id}
pub async fn get_channel(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let channel = channel_repo::get_by_id(&state.pool, *id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("channel {} not found", *id)))?;
    Ok(HttpResponse::Ok().json(summarize(&state, channel).await?))
}

/// GET /channels/{id}/ingestion-status
pub async fn ingestion_status(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    let channel_id = *id;
    let channel = channel_repo::get_by_id(&state.pool, channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("channel {channel_id} not found")))?;

    let videos_ingested = channel_repo::count_videos(&state.pool, channel_id).await?;

    let (status, error_message) = if state.ingestor.is_active(channel_id) {
        (IngestionStatus::Loading, None)
    } else if channel.name == crate::models::CHANNEL_NAME_FAILED {
        (IngestionStatus::Failed, Some(format!("ingestion of channel {channel_id} failed")))
    } else if channel.name == crate::models::CHANNEL_NAME_LOADING {
        // Never scheduled or crashed before the background task ran.
        (IngestionStatus::Loading, None)
    } else {
        (IngestionStatus::Completed, None)
    };

    Ok(HttpResponse::Ok().json(IngestionStatusResponse {
        status,
        videos_found: channel.total_videos,
        videos_ingested,
        started_at: channel.created_at,
        completed_at: channel.ingestion_completed_at,
        error_message,
    }))
}

/// GET /channels/{id}/videos
pub async fn list_channel_videos(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    let channel_id = *id;
    channel_repo::get_by_id(&state.pool, channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("channel {channel_id} not found")))?;

    let filter = crate::db::video_repo::VideoFilter {
        channel_id: Some(channel_id),
        limit: 10_000,
        offset: 0,
        ..Default::default()
    };
    let videos = crate::db::video_repo::list(&state.pool, &filter).await?;
    let status_counts = state.queue.stats_for_channel(channel_id).await?;

    Ok(HttpResponse::Ok().json(ChannelVideosResponse {
        total: videos.len() as i64,
        videos,
        status_counts,
    }))
}

/// DELETE /channels/{id}
pub async fn delete_channel(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let deleted = channel_repo::delete(&state.pool, *id).await?;
    if deleted {
        Ok(HttpResponse::Ok().finish())
    } else {
        Err(AppError::NotFound(format!("channel {} not found", *id)))
    }
}
