/// Caption track discovery from page metadata
use super::http::CaptionHttp;
use super::{CaptionTrackDescriptor, TrackKind};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::YouTubeConfig;

/// Name of the global the watch page assigns its player metadata to
const PLAYER_RESPONSE_VAR: &str = "ytInitialPlayerResponse";

/// What the locator can look at for a page
#[derive(Debug, Clone, Default)]
pub struct PageSource {
    /// Player metadata blob, either bare JSON or script text containing the assignment
    pub embedded_json: Option<String>,
    /// Full page HTML
    pub raw_html: Option<String>,
}

impl PageSource {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            embedded_json: None,
            raw_html: Some(html.into()),
        }
    }

    pub fn from_embedded_json(json: impl Into<String>) -> Self {
        Self {
            embedded_json: Some(json.into()),
            raw_html: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    captions: Option<PlayerCaptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCaptions {
    player_captions_tracklist_renderer: Option<CaptionTracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklist {
    #[serde(default)]
    caption_tracks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: Option<String>,
    language_code: Option<String>,
    kind: Option<String>,
    name: Option<TrackName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TrackNameRun>,
}

#[derive(Debug, Deserialize)]
struct TrackNameRun {
    text: Option<String>,
}

impl TrackName {
    fn label(&self) -> Option<String> {
        self.simple_text
            .clone()
            .or_else(|| self.runs.first().and_then(|r| r.text.clone()))
    }
}

/// Finds caption track descriptors in page metadata
#[derive(Clone)]
pub struct CaptionLocator {
    http: Arc<dyn CaptionHttp>,
    youtube: YouTubeConfig,
}

impl CaptionLocator {
    pub fn new(http: Arc<dyn CaptionHttp>, youtube: YouTubeConfig) -> Self {
        Self { http, youtube }
    }

    /// Locate caption tracks in a page. Never fails; no tracks is a valid answer.
    pub fn locate(&self, page: &PageSource) -> Vec<CaptionTrackDescriptor> {
        if let Some(tracks) = self.locate_in_embedded_json(page) {
            return tracks;
        }

        if let Some(html) = &page.raw_html {
            let tracks = locate_direct_urls(html);
            if !tracks.is_empty() {
                info!("🔗 Found {} caption URL(s) directly in page HTML", tracks.len());
                return tracks;
            }
        }

        debug!("No caption tracks found in page source");
        Vec::new()
    }

    /// Scan every candidate region for the player response; `None` when nothing parsed
    fn locate_in_embedded_json(&self, page: &PageSource) -> Option<Vec<CaptionTrackDescriptor>> {
        for candidate in candidate_regions(page) {
            for object in find_player_response_objects(&candidate) {
                match serde_json::from_str::<serde_json::Value>(object) {
                    Ok(value) => {
                        debug!("Parsed embedded player response ({} bytes)", object.len());
                        let tracks = tracks_from_player_response(&value);
                        if tracks.is_empty() {
                            // A later region may carry the complete response
                            debug!("Player response candidate lists no caption tracks");
                            continue;
                        }
                        info!("📋 Found {} caption track(s) in embedded metadata", tracks.len());
                        return Some(tracks);
                    }
                    Err(e) => {
                        debug!("Embedded JSON candidate failed to parse: {}", e);
                    }
                }
            }
        }
        None
    }

    /// Last-resort locator: ask the player API directly
    pub async fn locate_via_api(&self, video_id: &str) -> Vec<CaptionTrackDescriptor> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": "en",
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": self.youtube.client_version,
                }
            },
            "videoId": video_id,
        });

        info!("🛰️ Querying player API for caption tracks: {}", video_id);

        let text = match self.http.post_json(&self.youtube.player_api_url, &body).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Player API request failed: {}", e);
                return Vec::new();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Player API returned unparsable JSON: {}", e);
                return Vec::new();
            }
        };

        let tracks = tracks_from_player_response(&value);
        if tracks.is_empty() {
            if let Some(status) = value.get("playabilityStatus") {
                debug!(
                    "Player API lists no tracks; playability {} ({})",
                    status.get("status").and_then(|s| s.as_str()).unwrap_or("unknown"),
                    status.get("reason").and_then(|s| s.as_str()).unwrap_or("no reason")
                );
            }
        } else {
            info!("📋 Player API found {} caption track(s)", tracks.len());
        }
        tracks
    }
}

/// Pick the track to fetch: first language code starting with "en", else the first track
pub fn select_track(tracks: &[CaptionTrackDescriptor]) -> Option<&CaptionTrackDescriptor> {
    tracks
        .iter()
        .find(|t| t.language_code.starts_with("en"))
        .or_else(|| tracks.first())
}

/// Prefer human captions in the given language order, then generated ones, then anything
pub fn select_preferred_track<'a>(
    tracks: &'a [CaptionTrackDescriptor],
    languages: &[&str],
) -> Option<&'a CaptionTrackDescriptor> {
    for kind in [TrackKind::Standard, TrackKind::AutoGenerated] {
        for lang in languages {
            if let Some(track) = tracks
                .iter()
                .find(|t| t.kind == kind && t.language_code == *lang)
            {
                return Some(track);
            }
        }
    }
    tracks.first()
}

/// Read `captions.playerCaptionsTracklistRenderer.captionTracks` from a player response
pub fn tracks_from_player_response(value: &serde_json::Value) -> Vec<CaptionTrackDescriptor> {
    let response: PlayerResponse = match serde_json::from_value(value.clone()) {
        Ok(response) => response,
        Err(e) => {
            debug!("Player response has unexpected shape: {}", e);
            return Vec::new();
        }
    };

    let raw_tracks = response
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    raw_tracks
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<RawCaptionTrack>(raw).ok())
        .filter_map(|track| {
            let language_code = track.language_code?;
            let source_url_template = track.base_url?;
            Some(CaptionTrackDescriptor {
                language_code,
                kind: TrackKind::from_metadata(track.kind.as_deref()),
                source_url_template,
                name: track.name.and_then(|n| n.label()),
            })
        })
        .collect()
}

/// Regions that may contain the player response, most specific first
fn candidate_regions(page: &PageSource) -> Vec<String> {
    let mut regions = Vec::new();

    if let Some(blob) = &page.embedded_json {
        regions.push(blob.clone());
    }

    if let Some(html) = &page.raw_html {
        let document = Html::parse_document(html);
        if let Ok(selector) = Selector::parse("script") {
            for script in document.select(&selector) {
                let text: String = script.text().collect();
                if text.contains(PLAYER_RESPONSE_VAR) {
                    regions.push(text);
                }
            }
        }
        regions.push(html.clone());
    }

    regions
}

/// Complete JSON objects assigned to the player response global in `text`.
///
/// A region that is itself a bare JSON object is returned as-is.
fn find_player_response_objects(text: &str) -> Vec<&str> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        return extract_json_object(trimmed).into_iter().collect();
    }

    let assignment = match Regex::new(&format!(r"{}\s*=\s*", PLAYER_RESPONSE_VAR)) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    assignment
        .find_iter(text)
        .filter_map(|m| {
            let rest = &text[m.end()..];
            if rest.starts_with('{') {
                extract_json_object(rest)
            } else {
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InString,
    Escape,
}

/// Return the first balanced `{...}` object in `input`.
///
/// Braces inside string literals (including escaped quotes) do not count.
pub fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let body = &input[start..];
    let mut state = ScanState::Outside;
    let mut depth = 0usize;

    for (i, ch) in body.char_indices() {
        state = match (state, ch) {
            (ScanState::Escape, _) => ScanState::InString,
            (ScanState::InString, '\\') => ScanState::Escape,
            (ScanState::InString, '"') => ScanState::Outside,
            (ScanState::InString, _) => ScanState::InString,
            (ScanState::Outside, '"') => ScanState::InString,
            (ScanState::Outside, '{') => {
                depth += 1;
                ScanState::Outside
            }
            (ScanState::Outside, '}') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&body[..i + ch.len_utf8()]);
                }
                ScanState::Outside
            }
            (ScanState::Outside, _) => ScanState::Outside,
        };
    }

    None
}

/// Undo the JS string escapes YouTube uses inside inline JSON
pub fn unescape_caption_url(url: &str) -> String {
    url.replace("\\u0026", "&").replace("\\/", "/")
}

/// Find caption API URL literals directly in HTML
fn locate_direct_urls(html: &str) -> Vec<CaptionTrackDescriptor> {
    let re = match Regex::new(r#""(https?:(?:\\?/){2}[^"]*?(?:\\?/)api(?:\\?/)timedtext[^"]*)""#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut tracks: Vec<CaptionTrackDescriptor> = Vec::new();
    for captures in re.captures_iter(html) {
        let raw = match captures.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let url = unescape_caption_url(raw);
        if tracks.iter().any(|t| t.source_url_template == url) {
            continue;
        }
        tracks.push(descriptor_from_url(url));
    }
    tracks
}

/// Build a descriptor from a bare caption URL, reading `lang` and `kind` from its query
fn descriptor_from_url(url: String) -> CaptionTrackDescriptor {
    let (language_code, kind) = match url::Url::parse(&url) {
        Ok(parsed) => {
            let lang = parsed
                .query_pairs()
                .find(|(k, _)| k == "lang")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            let kind = parsed
                .query_pairs()
                .find(|(k, _)| k == "kind")
                .map(|(_, v)| v.to_string());
            (lang, TrackKind::from_metadata(kind.as_deref()))
        }
        Err(_) => (String::new(), TrackKind::Standard),
    };

    CaptionTrackDescriptor {
        language_code,
        kind,
        source_url_template: url,
        name: None,
    }
}
