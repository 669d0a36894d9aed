/// Client and wire types for the external transcript service
use super::http::CaptionHttp;
use super::{CaptionError, Transcript, TranscriptSegment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One segment as served by the transcript service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSegment {
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
    pub text: String,
}

/// Response body of `GET /transcript`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServiceTranscriptResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<ServiceSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceTranscriptResponse {
    /// Failure body with an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Convert to a transcript without merging; `None` unless successful with text
    pub fn into_transcript(self) -> Option<Transcript> {
        if !self.success {
            return None;
        }

        let segments: Vec<TranscriptSegment> = self
            .segments
            .into_iter()
            .filter_map(|s| {
                let text = s.text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(TranscriptSegment {
                    start: s.start.max(0.0),
                    duration: s.duration.max(0.0),
                    text: text.to_string(),
                })
            })
            .collect();

        Transcript::new(segments).map(|t| t.with_language(self.language, self.is_generated))
    }
}

/// Talks to a transcript service at `base_url`
#[derive(Clone)]
pub struct TranscriptServiceClient {
    http: Arc<dyn CaptionHttp>,
    base_url: String,
    language: Option<String>,
}

impl TranscriptServiceClient {
    pub fn new(http: Arc<dyn CaptionHttp>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: None,
        }
    }

    /// Ask the service for captions in `language`; empty means the service default
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into()).filter(|l| !l.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request the transcript for `video_id`
    pub async fn fetch(&self, video_id: &str) -> Result<ServiceTranscriptResponse, CaptionError> {
        let mut url = format!("{}/transcript?v={}", self.base_url, urlencoding::encode(video_id));
        if let Some(language) = &self.language {
            url.push_str("&lang=");
            url.push_str(&urlencoding::encode(language));
        }
        debug!("Requesting transcript service: {}", url);

        let body = self.http.get_text(&url).await?;
        if body.trim().is_empty() {
            return Err(CaptionError::EmptyBody);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
