use std::sync::Arc;

use log::debug;

use crate::catalog::TranscriptCatalog;
use crate::error::Result;
use crate::http::{HttpClient, HttpSettings, ReqwestClient};
use crate::youtube::{CaptionsSource, Strategy};
use crate::{FetchedTranscript, resolve_video_id};

/// Entry point tying caption discovery, track selection and fetching together
pub struct TranscriptApi {
    http: Arc<dyn HttpClient>,
    source: Box<dyn CaptionsSource>,
}

impl TranscriptApi {
    pub fn new(settings: HttpSettings, strategy: Strategy) -> Result<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(settings)?);
        Ok(Self::with_client(http, strategy))
    }

    pub fn with_client(http: Arc<dyn HttpClient>, strategy: Strategy) -> Self {
        let source = strategy.source(Arc::clone(&http));
        Self { http, source }
    }

    /// List every transcript available for a video ID or URL
    pub async fn list(&self, video: &str) -> Result<TranscriptCatalog> {
        let video_id = resolve_video_id(video)?;
        debug!("Listing transcripts for {video_id}");
        let captions = self.source.captions(&video_id).await?;
        TranscriptCatalog::build(Arc::clone(&self.http), &video_id, &captions)
    }

    /// Fetch the transcript in the first available of `languages`
    pub async fn fetch<S: AsRef<str>>(
        &self,
        video: &str,
        languages: &[S],
        preserve_formatting: bool,
    ) -> Result<FetchedTranscript> {
        let catalog = self.list(video).await?;
        catalog.find_transcript(languages)?.fetch(preserve_formatting).await
    }
}
