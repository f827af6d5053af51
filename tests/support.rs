//! Shared scaffolding for the end-to-end HTTP scenario tests: a scripted
//! extractor double and an `actix_web` app factory wired the same way as
//! the real binary.
use actix_web::{web, App};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use transcript_harvester::services::extractor::{ChannelListing, TranscriptExtractor, TranscriptResult, VideoEntry};
use transcript_harvester::{db, AppState};

/// Per-video scripted responses for `fetch_transcript`, consumed in
/// order so a test can make the same video fail N times before
/// succeeding.
#[derive(Default)]
pub struct FakeExtractor {
    listings: Mutex<HashMap<String, ChannelListing>>,
    transcripts: Mutex<HashMap<String, Vec<Result<TranscriptResult, String>>>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, channel_url: &str, listing: ChannelListing) -> Self {
        self.listings.lock().unwrap().insert(channel_url.to_string(), listing);
        self
    }

    /// Queue one response for `video_url`; later calls pop from the
    /// front, the last queued response repeats once the queue is empty.
    pub fn with_transcript_sequence(self, video_url: &str, responses: Vec<Result<TranscriptResult, String>>) -> Self {
        self.transcripts.lock().unwrap().insert(video_url.to_string(), responses);
        self
    }
}

pub fn video_entry(id: &str, title: &str) -> VideoEntry {
    VideoEntry {
        id: Some(id.to_string()),
        webpage_url: Some(format!("https://video.example/watch?v={id}")),
        url: None,
        title: Some(title.to_string()),
    }
}

pub fn transcript_ok(language: &str, content: &str) -> TranscriptResult {
    TranscriptResult {
        language: language.to_string(),
        content: content.to_string(),
        is_auto_generated: false,
        available_langs: vec![language.to_string()],
        auto_langs: vec![],
    }
}

#[async_trait]
impl TranscriptExtractor for FakeExtractor {
    async fn list_channel(&self, url: &str) -> Result<ChannelListing, String> {
        Ok(self.listings.lock().unwrap().get(url).cloned().unwrap_or_default())
    }

    async fn fetch_transcript(
        &self,
        video_url: &str,
        _preferred_langs: &[String],
        _include_auto: bool,
    ) -> Result<TranscriptResult, String> {
        let mut transcripts = self.transcripts.lock().unwrap();
        let Some(queue) = transcripts.get_mut(video_url) else {
            return Err("not found: no script for this video".to_string());
        };
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        }
    }
}

pub async fn test_state(extractor: Arc<dyn TranscriptExtractor>) -> web::Data<AppState> {
    let pool = db::init_test_pool().await;
    let state = AppState::new(pool, extractor);
    state.run_startup_recovery().await.expect("startup recovery");
    web::Data::new(state)
}

/// Build the same route table as the production binary so integration
/// tests exercise real routing, extraction, and serialization.
pub fn app_factory(
    state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    use transcript_harvester::handlers;

    App::new()
        .app_data(state)
        .service(
            web::resource("/channels")
                .route(web::post().to(handlers::create_channels))
                .route(web::get().to(handlers::list_channels)),
        )
        .service(
            web::resource("/channels/{id}")
                .route(web::get().to(handlers::get_channel))
                .route(web::delete().to(handlers::delete_channel)),
        )
        .service(web::resource("/channels/{id}/ingestion-status").route(web::get().to(handlers::ingestion_status)))
        .service(web::resource("/channels/{id}/videos").route(web::get().to(handlers::list_channel_videos)))
        .service(web::resource("/videos").route(web::get().to(handlers::list_videos)))
        .service(web::resource("/videos/queue/stats").route(web::get().to(handlers::queue_stats)))
        .service(web::resource("/videos/queue/failed").route(web::get().to(handlers::queue_failed)))
        .service(
            web::resource("/videos/{id}")
                .route(web::get().to(handlers::get_video))
                .route(web::delete().to(handlers::delete_video)),
        )
        .service(web::resource("/videos/{id}/retry").route(web::post().to(handlers::retry_video)))
        .service(web::resource("/jobs/status").route(web::get().to(handlers::job_status)))
        .service(web::resource("/jobs/start").route(web::post().to(handlers::start_job)))
        .service(web::resource("/jobs/pause").route(web::post().to(handlers::pause_job)))
        .service(web::resource("/jobs/resume").route(web::post().to(handlers::resume_job)))
        .service(web::resource("/jobs/stop").route(web::post().to(handlers::stop_job)))
        .service(web::resource("/jobs/reconcile").route(web::post().to(handlers::reconcile_job)))
        .service(
            web::resource("/jobs/settings")
                .route(web::get().to(handlers::get_settings))
                .route(web::post().to(handlers::update_settings)),
        )
        .service(web::resource("/jobs/cleanup").route(web::post().to(handlers::cleanup_logs)))
        .service(web::resource("/jobs/logs").route(web::get().to(handlers::list_logs)))
        .service(web::resource("/jobs/workers/status").route(web::get().to(handlers::workers_status)))
        .service(web::resource("/jobs/workers/start").route(web::post().to(handlers::workers_start)))
        .service(web::resource("/jobs/workers/stop").route(web::post().to(handlers::workers_stop)))
        .service(web::resource("/jobs/workers/restart").route(web::post().to(handlers::workers_restart)))
}

/// Poll until `condition` resolves true or the budget expires, for
/// waiting on detached background tasks (channel enumeration, worker
/// processing) without a fixed sleep.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("condition not met within budget");
}
