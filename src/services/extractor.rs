//! Extractor adapter contract.
//!
//! The real extractor (a library or subprocess scraping a video
//! platform) is out of scope; this module only defines the typed
//! interface the rest of the engine consumes.
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct VideoEntry {
    pub id: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelListing {
    pub channel_title: Option<String>,
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub language: String,
    pub content: String,
    pub is_auto_generated: bool,
    pub available_langs: Vec<String>,
    pub auto_langs: Vec<String>,
}

/// Listing + transcript fetch, implemented by an out-of-scope adapter.
/// Failures are human-readable strings, classifiable via
/// `services::classifier::classify`.
#[async_trait]
pub trait TranscriptExtractor: Send + Sync {
    async fn list_channel(&self, url: &str) -> Result<ChannelListing, String>;

    async fn fetch_transcript(
        &self,
        video_url: &str,
        preferred_langs: &[String],
        include_auto: bool,
    ) -> Result<TranscriptResult, String>;
}
