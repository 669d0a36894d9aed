//! API request handlers

use std::sync::Arc;
use tracing::{info, warn};

use super::models::{EndpointInfo, HealthResponse, ServiceInfo, ServiceSegment, ServiceTranscriptResponse};
use crate::config::Config;
use crate::transcript::locator::select_preferred_track;
use crate::transcript::{CaptionFetcher, CaptionHttp, CaptionLocator, CaptionParser, PageSource};

pub const SERVICE_NAME: &str = "youtube-transcript-server";

/// Why a transcript request could not be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    MissingVideoId,
    InvalidVideoId(String),
    NotFound(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::MissingVideoId => write!(f, "Missing video ID parameter 'v'"),
            LookupError::InvalidVideoId(v) => write!(f, "Invalid video ID: {}", v),
            LookupError::NotFound(v) => write!(f, "No transcript available for video {}", v),
        }
    }
}

pub fn health_check() -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
    }
}

pub fn service_info() -> ServiceInfo {
    let endpoint = |path: &str, description: &str| EndpointInfo {
        path: path.to_string(),
        description: description.to_string(),
    };

    ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: vec![
            endpoint("/transcript?v=VIDEO_ID&lang=en", "Caption segments for a video"),
            endpoint("/health", "Health check"),
        ],
    }
}

/// Serves raw (unmerged) caption segments for a video
#[derive(Clone)]
pub struct TranscriptLookup {
    http: Arc<dyn CaptionHttp>,
    locator: CaptionLocator,
    fetcher: CaptionFetcher,
    parser: CaptionParser,
    watch_url: String,
    fallback_languages: Vec<String>,
}

impl TranscriptLookup {
    pub fn new(config: &Config, http: Arc<dyn CaptionHttp>) -> Self {
        Self {
            locator: CaptionLocator::new(http.clone(), config.youtube.clone()),
            fetcher: CaptionFetcher::new(http.clone(), config.youtube.timedtext_url.clone()),
            parser: CaptionParser::new(),
            watch_url: config.youtube.watch_url.clone(),
            fallback_languages: config.server.fallback_languages.clone(),
            http,
        }
    }

    pub async fn lookup(&self, video: Option<&str>, lang: Option<&str>) -> Result<ServiceTranscriptResponse, LookupError> {
        let raw = video.map(str::trim).filter(|v| !v.is_empty()).ok_or(LookupError::MissingVideoId)?;
        let video_id = crate::transcript::extract_video_id(raw).ok_or_else(|| LookupError::InvalidVideoId(raw.to_string()))?;

        info!("📥 Transcript request for {} (lang {})", video_id, lang.unwrap_or("en"));

        let mut tracks = match url::Url::parse_with_params(&self.watch_url, &[("v", video_id.as_str())]) {
            Ok(url) => match self.http.get_text(url.as_str()).await {
                Ok(html) => self.locator.locate(&PageSource::from_html(html)),
                Err(e) => {
                    warn!("Watch page fetch failed for {}: {}", video_id, e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        if tracks.is_empty() {
            tracks = self.locator.locate_via_api(&video_id).await;
        }

        let mut languages: Vec<&str> = Vec::new();
        if let Some(lang) = lang.filter(|l| !l.is_empty()) {
            languages.push(lang);
        }
        for fallback in &self.fallback_languages {
            if !languages.contains(&fallback.as_str()) {
                languages.push(fallback);
            }
        }

        let track = select_preferred_track(&tracks, &languages).ok_or_else(|| LookupError::NotFound(video_id.clone()))?;
        let payload = self
            .fetcher
            .fetch(track, &video_id)
            .await
            .ok_or_else(|| LookupError::NotFound(video_id.clone()))?;

        let segments: Vec<ServiceSegment> = self
            .parser
            .parse(&payload.body)
            .into_iter()
            .map(|event| ServiceSegment {
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
                text: event.text,
            })
            .collect();

        if segments.is_empty() {
            return Err(LookupError::NotFound(video_id));
        }

        let full_text = segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
        info!("✅ Served {} segments for {} ({})", segments.len(), video_id, track.language_code);

        Ok(ServiceTranscriptResponse {
            success: true,
            video_id: Some(video_id),
            language: Some(track.language_code.clone()),
            is_generated: Some(track.kind.is_generated()),
            segments,
            full_text: Some(full_text),
            error: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transcript::CaptionError;
    use async_trait::async_trait;

    /// Watch page listing a generated English and a human German track
    pub(crate) struct FakeYouTube;

    const WATCH_HTML: &str = r#"<html><script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
        {"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr","languageCode":"en","kind":"asr"},
        {"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=de","languageCode":"de"}
    ]}}};</script></html>"#;

    #[async_trait]
    impl CaptionHttp for FakeYouTube {
        async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
            if url.contains("/watch") {
                if url.contains("v=dQw4w9WgXcQ") {
                    Ok(WATCH_HTML.to_string())
                } else {
                    Ok("<html></html>".to_string())
                }
            } else if url.contains("lang=de") {
                Ok(r#"<transcript><text start="0" dur="1">Hallo</text><text start="1" dur="1">Welt</text></transcript>"#.to_string())
            } else if url.contains("lang=en") {
                Ok(r#"{"events":[{"tStartMs":0,"dDurationMs":900,"segs":[{"utf8":"Hi"}]},{"tStartMs":900,"dDurationMs":900,"segs":[{"utf8":"there"}]}]}"#.to_string())
            } else {
                Err(CaptionError::Status(404))
            }
        }

        async fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<String, CaptionError> {
            Ok("{}".to_string())
        }
    }

    fn lookup() -> TranscriptLookup {
        TranscriptLookup::new(&Config::default(), Arc::new(FakeYouTube))
    }

    #[tokio::test]
    async fn test_lookup_returns_unmerged_segments() {
        let response = lookup().lookup(Some("dQw4w9WgXcQ"), Some("de")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.language.as_deref(), Some("de"));
        assert_eq!(response.is_generated, Some(false));
        assert_eq!(response.segments.len(), 2);
        assert_eq!(response.full_text.as_deref(), Some("Hallo Welt"));
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_english() {
        let response = lookup()
            .lookup(Some("https://youtu.be/dQw4w9WgXcQ"), Some("fr"))
            .await
            .unwrap();
        assert_eq!(response.language.as_deref(), Some("en"));
        assert_eq!(response.is_generated, Some(true));
        assert_eq!(response.segments.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        assert_eq!(lookup().lookup(None, None).await.unwrap_err(), LookupError::MissingVideoId);
        assert!(matches!(
            lookup().lookup(Some("nope"), None).await.unwrap_err(),
            LookupError::InvalidVideoId(_)
        ));
        assert!(matches!(
            lookup().lookup(Some("aaaaaaaaaaa"), None).await.unwrap_err(),
            LookupError::NotFound(_)
        ));
    }

    #[test]
    fn test_health_and_info() {
        assert_eq!(health_check().status, "ok");
        assert_eq!(service_info().endpoints.len(), 2);
    }
}
