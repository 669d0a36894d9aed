/// Transcript acquisition strategies tried by the pipeline
use super::fetcher::CaptionFetcher;
use super::http::CaptionHttp;
use super::locator::{select_track, CaptionLocator, PageSource};
use super::normalizer::SegmentNormalizer;
use super::parser::CaptionParser;
use super::service::TranscriptServiceClient;
use super::{CaptionTrackDescriptor, Transcript};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One way of obtaining a transcript for a video
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Short name used in logs and in the pipeline result
    fn name(&self) -> &str;

    /// Try to produce a transcript; `None` on any failure
    async fn attempt(&self, video_id: &str) -> Option<Transcript>;
}

/// The page a user is currently looking at
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Video the page is showing, if known
    fn video_id(&self) -> Option<String>;

    /// Script text / HTML of the page
    fn page_html(&self) -> Option<String>;

    /// Player metadata fetched from the page's own execution context
    async fn player_response(&self) -> Option<String>;
}

/// A page snapshot loaded from disk
#[derive(Debug, Clone)]
pub struct StaticPage {
    video_id: Option<String>,
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            video_id: None,
            html: html.into(),
        }
    }

    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }
}

#[async_trait]
impl PageContext for StaticPage {
    fn video_id(&self) -> Option<String> {
        self.video_id.clone()
    }

    fn page_html(&self) -> Option<String> {
        Some(self.html.clone())
    }

    async fn player_response(&self) -> Option<String> {
        // A saved page has no live player to ask
        None
    }
}

/// Shared locate-result → fetch → parse → normalize chain
#[derive(Clone)]
pub struct CaptionExtractor {
    locator: CaptionLocator,
    fetcher: CaptionFetcher,
    parser: CaptionParser,
    normalizer: SegmentNormalizer,
}

impl CaptionExtractor {
    pub fn new(locator: CaptionLocator, fetcher: CaptionFetcher) -> Self {
        Self {
            locator,
            fetcher,
            parser: CaptionParser::new(),
            normalizer: SegmentNormalizer::new(),
        }
    }

    pub fn locator(&self) -> &CaptionLocator {
        &self.locator
    }

    /// Select a track from `tracks` and turn it into a transcript
    pub async fn extract(&self, tracks: &[CaptionTrackDescriptor], video_id: &str) -> Option<Transcript> {
        let track = select_track(tracks)?;
        info!(
            "🎯 Selected caption track: {} ({}{})",
            track.language_code,
            if track.kind.is_generated() { "auto-generated" } else { "standard" },
            track.name.as_deref().map(|n| format!(", {}", n)).unwrap_or_default()
        );

        let payload = self.fetcher.fetch(track, video_id).await?;
        let events = self.parser.parse(&payload.body);
        if events.is_empty() {
            warn!("⚠️ Caption payload from {} variant had no usable content", payload.variant);
            return None;
        }

        let transcript = self.normalizer.normalize(&events)?;
        info!(
            "📝 Normalized {} caption events into {} segments",
            events.len(),
            transcript.len()
        );
        Some(transcript.with_language(Some(track.language_code.clone()), Some(track.kind.is_generated())))
    }
}

/// Strategy 0: ask the external transcript service
pub struct TranscriptServiceStrategy {
    client: TranscriptServiceClient,
}

impl TranscriptServiceStrategy {
    pub fn new(client: TranscriptServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranscriptStrategy for TranscriptServiceStrategy {
    fn name(&self) -> &str {
        "transcript-service"
    }

    async fn attempt(&self, video_id: &str) -> Option<Transcript> {
        match self.client.fetch(video_id).await {
            Ok(response) => {
                if let Some(error) = &response.error {
                    debug!("Transcript service reported: {}", error);
                }
                let transcript = response.into_transcript();
                if transcript.is_none() {
                    debug!("Transcript service had no segments for {}", video_id);
                }
                transcript
            }
            Err(e) => {
                warn!("Transcript service at {} unavailable: {}", self.client.base_url(), e);
                None
            }
        }
    }
}

/// Strategy 1: use the page the user already has open
pub struct CurrentPageStrategy {
    page: Arc<dyn PageContext>,
    extractor: CaptionExtractor,
    metadata_timeout: Duration,
}

impl CurrentPageStrategy {
    pub fn new(page: Arc<dyn PageContext>, extractor: CaptionExtractor, metadata_timeout: Duration) -> Self {
        Self {
            page,
            extractor,
            metadata_timeout,
        }
    }

    async fn player_metadata(&self) -> Option<String> {
        match tokio::time::timeout(self.metadata_timeout, self.page.player_response()).await {
            Ok(response) => response,
            Err(_) => {
                debug!("Player metadata retrieval timed out after {:?}", self.metadata_timeout);
                None
            }
        }
    }
}

#[async_trait]
impl TranscriptStrategy for CurrentPageStrategy {
    fn name(&self) -> &str {
        "current-page"
    }

    async fn attempt(&self, video_id: &str) -> Option<Transcript> {
        if let Some(page_video) = self.page.video_id() {
            if page_video != video_id {
                debug!("Current page shows {}, not {}", page_video, video_id);
                return None;
            }
        }

        let page = PageSource {
            embedded_json: None,
            raw_html: self.page.page_html(),
        };
        let mut tracks = self.extractor.locator().locate(&page);

        if tracks.is_empty() {
            if let Some(json) = self.player_metadata().await {
                tracks = self.extractor.locator().locate(&PageSource::from_embedded_json(json));
            }
        }

        if tracks.is_empty() {
            debug!("No caption tracks on the current page");
            return None;
        }

        self.extractor.extract(&tracks, video_id).await
    }
}

/// Strategy 2: download the watch page and start over
pub struct FetchedPageStrategy {
    http: Arc<dyn CaptionHttp>,
    extractor: CaptionExtractor,
    watch_url: String,
}

impl FetchedPageStrategy {
    pub fn new(http: Arc<dyn CaptionHttp>, extractor: CaptionExtractor, watch_url: impl Into<String>) -> Self {
        Self {
            http,
            extractor,
            watch_url: watch_url.into(),
        }
    }

    async fn fetch_page(&self, video_id: &str) -> Option<String> {
        let url = url::Url::parse_with_params(&self.watch_url, &[("v", video_id)]).ok()?;
        match self.http.get_text(url.as_str()).await {
            Ok(html) => {
                debug!("Fetched watch page ({} bytes)", html.len());
                Some(html)
            }
            Err(e) => {
                warn!("Failed to fetch watch page for {}: {}", video_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl TranscriptStrategy for FetchedPageStrategy {
    fn name(&self) -> &str {
        "fetched-page"
    }

    async fn attempt(&self, video_id: &str) -> Option<Transcript> {
        let mut tracks = match self.fetch_page(video_id).await {
            Some(html) => self.extractor.locator().locate(&PageSource::from_html(html)),
            None => Vec::new(),
        };

        if tracks.is_empty() {
            tracks = self.extractor.locator().locate_via_api(video_id).await;
        }

        if tracks.is_empty() {
            info!("🚫 No caption tracks available for {}", video_id);
            return None;
        }

        self.extractor.extract(&tracks, video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YouTubeConfig;
    use crate::transcript::CaptionError;

    const PLAYER_JSON: &str = r#"{"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid00000001&lang=en","languageCode":"en"}]}}}"#;
    const JSON3: &str = r#"{"events":[{"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"Hi"}]},{"tStartMs":1000,"dDurationMs":1000,"segs":[{"utf8":"there"}]}]}"#;

    /// Serves the caption payload for timedtext URLs and `page` for watch URLs
    struct FakeYouTube {
        page: Option<String>,
        player_api: Option<String>,
    }

    #[async_trait]
    impl CaptionHttp for FakeYouTube {
        async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
            if url.contains("/api/timedtext") {
                Ok(JSON3.to_string())
            } else if url.contains("/watch") {
                self.page.clone().ok_or(CaptionError::Status(429))
            } else {
                Err(CaptionError::Status(404))
            }
        }

        async fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<String, CaptionError> {
            self.player_api.clone().ok_or(CaptionError::Status(403))
        }
    }

    struct SlowPage;

    #[async_trait]
    impl PageContext for SlowPage {
        fn video_id(&self) -> Option<String> {
            None
        }

        fn page_html(&self) -> Option<String> {
            Some("<html><body>no scripts</body></html>".to_string())
        }

        async fn player_response(&self) -> Option<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some(PLAYER_JSON.to_string())
        }
    }

    struct LivePage;

    #[async_trait]
    impl PageContext for LivePage {
        fn video_id(&self) -> Option<String> {
            Some("vid00000001".to_string())
        }

        fn page_html(&self) -> Option<String> {
            None
        }

        async fn player_response(&self) -> Option<String> {
            Some(PLAYER_JSON.to_string())
        }
    }

    fn extractor(http: Arc<dyn CaptionHttp>) -> CaptionExtractor {
        let youtube = YouTubeConfig::default();
        let locator = CaptionLocator::new(http.clone(), youtube.clone());
        let fetcher = CaptionFetcher::new(http, youtube.timedtext_url);
        CaptionExtractor::new(locator, fetcher)
    }

    #[tokio::test]
    async fn test_current_page_from_script() {
        let http: Arc<dyn CaptionHttp> = Arc::new(FakeYouTube { page: None, player_api: None });
        let html = format!("<script>var ytInitialPlayerResponse = {};</script>", PLAYER_JSON);
        let page = Arc::new(StaticPage::new(html).with_video_id("vid00000001"));
        let strategy = CurrentPageStrategy::new(page, extractor(http), Duration::from_secs(2));

        let transcript = strategy.attempt("vid00000001").await.unwrap();
        assert_eq!(transcript.full_text(), "Hi there");
        assert_eq!(transcript.language(), Some("en"));
        assert_eq!(transcript.is_generated(), Some(false));

        assert!(strategy.attempt("otherVideo1").await.is_none());
    }

    #[tokio::test]
    async fn test_current_page_uses_player_metadata() {
        let http: Arc<dyn CaptionHttp> = Arc::new(FakeYouTube { page: None, player_api: None });
        let strategy = CurrentPageStrategy::new(Arc::new(LivePage), extractor(http), Duration::from_secs(2));
        assert!(strategy.attempt("vid00000001").await.is_some());
    }

    #[tokio::test]
    async fn test_current_page_metadata_timeout() {
        let http: Arc<dyn CaptionHttp> = Arc::new(FakeYouTube { page: None, player_api: None });
        let strategy = CurrentPageStrategy::new(Arc::new(SlowPage), extractor(http), Duration::from_millis(50));
        assert!(strategy.attempt("vid00000001").await.is_none());
    }

    #[tokio::test]
    async fn test_fetched_page_falls_back_to_player_api() {
        let http: Arc<dyn CaptionHttp> = Arc::new(FakeYouTube {
            page: Some("<html>consent wall</html>".to_string()),
            player_api: Some(PLAYER_JSON.to_string()),
        });
        let strategy = FetchedPageStrategy::new(http.clone(), extractor(http), YouTubeConfig::default().watch_url);
        assert_eq!(strategy.attempt("vid00000001").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetched_page_without_captions() {
        let http: Arc<dyn CaptionHttp> = Arc::new(FakeYouTube { page: None, player_api: None });
        let strategy = FetchedPageStrategy::new(http.clone(), extractor(http), YouTubeConfig::default().watch_url);
        assert!(strategy.attempt("vid00000001").await.is_none());
    }
}
