/// Caption acquisition and normalization
///
/// This module locates caption tracks for a YouTube video, fetches their payloads
/// through several fallback variants, parses structured (json3) or timed-XML captions,
/// and merges the raw events into readable, timestamp-addressable segments.

pub mod http;
pub mod locator;
pub mod fetcher;
pub mod parser;
pub mod normalizer;
pub mod service;
pub mod strategies;
pub mod pipeline;

// Re-export main types
pub use http::{CaptionHttp, ReqwestHttp};
pub use locator::{CaptionLocator, PageSource};
pub use fetcher::{CaptionFetcher, FetchVariant, FetchedPayload};
pub use parser::CaptionParser;
pub use normalizer::SegmentNormalizer;
pub use service::{TranscriptServiceClient, ServiceTranscriptResponse, ServiceSegment};
pub use strategies::{CaptionExtractor, TranscriptStrategy, TranscriptServiceStrategy, CurrentPageStrategy, FetchedPageStrategy, PageContext, StaticPage};
pub use pipeline::{TranscriptPipeline, PipelineState};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors raised while talking to caption endpoints.
///
/// None of these escape the pipeline: every strategy turns them into "no result".
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Whether a caption track was authored by a human or generated by speech recognition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Standard,
    AutoGenerated,
}

impl TrackKind {
    /// Map the `kind` field of YouTube caption metadata
    pub fn from_metadata(kind: Option<&str>) -> Self {
        match kind {
            Some("asr") => TrackKind::AutoGenerated,
            _ => TrackKind::Standard,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, TrackKind::AutoGenerated)
    }
}

/// One available caption track for a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionTrackDescriptor {
    /// BCP-47-ish language code, e.g. "en" or "en-GB"
    pub language_code: String,
    /// Human or auto-generated captions
    pub kind: TrackKind,
    /// Caption endpoint URL as advertised by the page
    pub source_url_template: String,
    /// Display label of the track, if the metadata carried one
    pub name: Option<String>,
}

/// A caption event as decoded from the payload, before merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCaptionEvent {
    pub start_ms: u64,
    pub duration_ms: u64,
    pub text: String,
}

impl RawCaptionEvent {
    pub fn new(start_ms: u64, duration_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            duration_ms,
            text: text.into(),
        }
    }
}

/// A normalized, addressable unit of transcript text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// Duration in seconds (0 when unknown)
    pub duration: f64,
    /// Trimmed, non-empty text
    pub text: String,
}

/// Serialized form of a transcript, validated on the way back in
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranscriptRecord {
    segments: Vec<TranscriptSegment>,
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    is_generated: Option<bool>,
}

/// A complete transcript: one or more segments plus their flattened text.
///
/// Immutable once built. Constructors return `None` instead of an empty transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TranscriptRecord", into = "TranscriptRecord")]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
    full_text: String,
    language: Option<String>,
    is_generated: Option<bool>,
}

impl Transcript {
    /// Build a transcript from segments; `None` when there are no segments
    pub fn new(segments: Vec<TranscriptSegment>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }

        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            segments,
            full_text,
            language: None,
            is_generated: None,
        })
    }

    /// Same transcript annotated with its source track language
    pub fn with_language(self, language: Option<String>, is_generated: Option<bool>) -> Self {
        Self {
            language,
            is_generated,
            ..self
        }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_generated(&self) -> Option<bool> {
        self.is_generated
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for the `len`/`is_empty` convention
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last segment, in seconds
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.start + s.duration)
            .fold(0.0, f64::max)
    }

    /// One `[m:ss] text` line per segment, as fed to the key-moments prompt
    pub fn timestamped_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("[{}] {}", format_timestamp(s.start), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rows for display: formatted timestamp, seek position and text
    pub fn display_rows(&self) -> Vec<DisplayRow> {
        self.segments
            .iter()
            .map(|s| DisplayRow {
                timestamp: format_timestamp(s.start),
                start_seconds: s.start,
                text: s.text.clone(),
            })
            .collect()
    }
}

impl TryFrom<TranscriptRecord> for Transcript {
    type Error = String;

    fn try_from(record: TranscriptRecord) -> Result<Self, Self::Error> {
        Transcript::new(record.segments)
            .map(|t| t.with_language(record.language, record.is_generated))
            .ok_or_else(|| "transcript has no segments".to_string())
    }
}

impl From<Transcript> for TranscriptRecord {
    fn from(transcript: Transcript) -> Self {
        Self {
            segments: transcript.segments,
            full_text: transcript.full_text,
            language: transcript.language,
            is_generated: transcript.is_generated,
        }
    }
}

/// A transcript line prepared for display
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayRow {
    pub timestamp: String,
    pub start_seconds: f64,
    pub text: String,
}

/// Format seconds as `m:ss`, or `h:mm:ss` past the hour
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hrs > 0 {
        format!("{}:{:02}:{:02}", hrs, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Extract the 11-character video ID from a bare ID or a watch/short/embed/shorts URL
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    let patterns = [
        r"^([a-zA-Z0-9_-]{11})$",
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ];

    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(captures) = re.captures(input) {
                return captures.get(1).map(|m| m.as_str().to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            duration: 1.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_transcript_requires_segments() {
        assert!(Transcript::new(Vec::new()).is_none());
    }

    #[test]
    fn test_full_text_joins_segments() {
        let transcript = Transcript::new(vec![segment(0.0, "Hello there"), segment(4.0, "world")]).unwrap();
        assert_eq!(transcript.full_text(), "Hello there world");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.total_duration(), 5.0);
    }

    #[test]
    fn test_transcript_deserialize_rebuilds_full_text() {
        let json = r#"{"segments":[{"start":0.0,"duration":1.0,"text":"a"},{"start":1.0,"duration":1.0,"text":"b"}],"full_text":"stale"}"#;
        let transcript: Transcript = serde_json::from_str(json).unwrap();
        assert_eq!(transcript.full_text(), "a b");

        let empty = r#"{"segments":[],"full_text":""}"#;
        assert!(serde_json::from_str::<Transcript>(empty).is_err());
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(3661.0), "1:01:01");
        assert_eq!(format_timestamp(-3.0), "0:00");
    }

    #[test]
    fn test_timestamped_text() {
        let transcript = Transcript::new(vec![segment(0.0, "Intro"), segment(75.0, "Main point")]).unwrap();
        assert_eq!(transcript.timestamped_text(), "[0:00] Intro\n[1:15] Main point");
        assert_eq!(transcript.display_rows()[1].timestamp, "1:15");
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("not a video"), None);
        assert_eq!(extract_video_id("short"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=short"), None);
    }

    #[test]
    fn test_track_kind_mapping() {
        assert_eq!(TrackKind::from_metadata(Some("asr")), TrackKind::AutoGenerated);
        assert_eq!(TrackKind::from_metadata(None), TrackKind::Standard);
        assert!(TrackKind::AutoGenerated.is_generated());
    }
}
