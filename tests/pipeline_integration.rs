use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use yt_ai_transcript::transcript::{CaptionError, CaptionHttp, PageContext, StaticPage};
use yt_ai_transcript::{ConfigBuilder, PipelineState, SessionContext, TranscriptPipeline};

const VIDEO: &str = "dQw4w9WgXcQ";

const PLAYER_HTML: &str = r#"<html><head><script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ"},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en","name":{"simpleText":"English"},"languageCode":"en"}]}}};</script></head><body></body></html>"#;

const JSON3: &str = r#"{"events":[
    {"tStartMs":0,"dDurationMs":800,"segs":[{"utf8":"Hi"}]},
    {"tStartMs":1000,"dDurationMs":1500,"segs":[{"utf8":"there"}]},
    {"tStartMs":10000,"dDurationMs":3000,"segs":[{"utf8":"Ownership is the core "},{"utf8":"idea of Rust"}]}
]}"#;

const SERVICE_BODY: &str = r#"{"success":true,"video_id":"dQw4w9WgXcQ","language":"en","is_generated":true,
    "segments":[{"start":0.0,"duration":0.8,"text":"Hi"},{"start":1.0,"duration":1.5,"text":"there"}],
    "full_text":"Hi there"}"#;

/// In-memory YouTube plus an optional transcript service
struct FakeTransport {
    service_up: bool,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    fn new(service_up: bool) -> Arc<Self> {
        Arc::new(Self {
            service_up,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requested(&self, needle: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|url| url.contains(needle))
    }
}

#[async_trait]
impl CaptionHttp for FakeTransport {
    async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
        self.requests.lock().unwrap().push(url.to_string());

        if url.starts_with("http://svc.test/") {
            return if self.service_up {
                Ok(SERVICE_BODY.to_string())
            } else {
                Err(CaptionError::Status(503))
            };
        }
        if url.contains("/watch") {
            return if url.contains(VIDEO) {
                Ok(PLAYER_HTML.to_string())
            } else {
                Ok("<html></html>".to_string())
            };
        }
        if url.contains("/api/timedtext") && url.contains("lang=en") {
            return Ok(JSON3.to_string());
        }
        Err(CaptionError::Status(404))
    }

    async fn post_json(&self, url: &str, _body: &serde_json::Value) -> Result<String, CaptionError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(r#"{"playabilityStatus":{"status":"ERROR"}}"#.to_string())
    }
}

fn pipeline(service: bool, http: Arc<FakeTransport>, page: Option<Arc<dyn PageContext>>) -> TranscriptPipeline {
    let service_url = service.then(|| "http://svc.test".to_string());
    let config = ConfigBuilder::new().with_service_url(service_url).build();
    TranscriptPipeline::standard(&config, http, None, page)
}

fn succeeded(state: PipelineState) -> (yt_ai_transcript::Transcript, String) {
    match state {
        PipelineState::Succeeded { transcript, strategy } => (transcript, strategy),
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_result_is_used_as_is() {
    let http = FakeTransport::new(true);
    let (transcript, strategy) = succeeded(pipeline(true, http.clone(), None).run(VIDEO).await);

    assert_eq!(strategy, "transcript-service");
    // Service segments are not re-merged
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.full_text(), "Hi there");
    assert_eq!(transcript.is_generated(), Some(true));
    assert!(!http.requested("/watch"));
}

#[tokio::test]
async fn test_service_down_falls_back_to_watch_page() {
    let http = FakeTransport::new(false);
    let (transcript, strategy) = succeeded(pipeline(true, http.clone(), None).run(VIDEO).await);

    assert_eq!(strategy, "fetched-page");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.segments()[0].text, "Hi there");
    assert_eq!(transcript.segments()[1].text, "Ownership is the core idea of Rust");
    assert_eq!(transcript.language(), Some("en"));
    assert_eq!(transcript.is_generated(), Some(false));
    assert!(http.requested("http://svc.test/transcript?v=dQw4w9WgXcQ&lang=en"));
    assert!(http.requested("fmt=json3"));
}

#[tokio::test]
async fn test_current_page_avoids_refetching_watch_page() {
    let http = FakeTransport::new(false);
    let page: Arc<dyn PageContext> = Arc::new(StaticPage::new(PLAYER_HTML).with_video_id(VIDEO));
    let pipeline = pipeline(false, http.clone(), Some(page));
    assert_eq!(pipeline.strategy_names(), vec!["current-page", "fetched-page"]);

    let (transcript, strategy) = succeeded(pipeline.run(VIDEO).await);
    assert_eq!(strategy, "current-page");
    assert_eq!(transcript.len(), 2);
    assert!(!http.requested("/watch"));
}

#[tokio::test]
async fn test_page_showing_another_video_is_skipped() {
    let http = FakeTransport::new(false);
    let page: Arc<dyn PageContext> = Arc::new(StaticPage::new(PLAYER_HTML).with_video_id("aaaaaaaaaaa"));

    let (_, strategy) = succeeded(pipeline(false, http.clone(), Some(page)).run(VIDEO).await);
    assert_eq!(strategy, "fetched-page");
    assert!(http.requested("/watch"));
}

#[tokio::test]
async fn test_video_without_captions_fails() {
    let http = FakeTransport::new(false);
    let state = pipeline(true, http.clone(), None).run("zzzzzzzzzzz").await;

    assert_eq!(state, PipelineState::Failed);
    assert!(state.is_terminal());
    assert!(state.transcript().is_none());
    assert!(http.requested("/youtubei/v1/player"));
}

#[tokio::test]
async fn test_stale_load_is_discarded() {
    let http = FakeTransport::new(false);
    let pipeline = pipeline(false, http, None);
    let session = SessionContext::new();

    let stale = session.navigate(VIDEO).await;
    let current = session.navigate("bbbbbbbbbbb").await;

    let state = pipeline.load_into(&session, &stale).await;
    assert!(matches!(state, PipelineState::Succeeded { .. }));
    assert!(session.current_transcript().await.is_none());
    assert_eq!(session.current_video().await.as_deref(), Some("bbbbbbbbbbb"));

    let again = session.navigate(VIDEO).await;
    assert!(!session.is_current(&current).await);
    pipeline.load_into(&session, &again).await;
    assert_eq!(session.current_transcript().await.unwrap().len(), 2);
}

#[test]
fn test_pipeline_without_strategies_fails() {
    let state = tokio_test::block_on(TranscriptPipeline::new(Vec::new()).run(VIDEO));
    assert_eq!(state, PipelineState::Failed);
}
