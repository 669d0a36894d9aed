/// Caption payload retrieval with format and transport fallbacks
use super::http::{truncate_url, CaptionHttp};
use super::{CaptionError, CaptionTrackDescriptor, TrackKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Structured caption format requested from the caption endpoint
const STRUCTURED_FORMAT: &str = "json3";

/// Request variants, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchVariant {
    /// Track URL with `fmt=json3`
    TemplateStructured,
    /// URL built from video id and language, `fmt=json3`
    SynthesizedStructured,
    /// Track URL without a format parameter
    TemplateDefault,
    /// Built URL without a format parameter
    SynthesizedDefault,
    /// Track URL with `fmt=json3` through the alternate transport
    Proxied,
}

impl std::fmt::Display for FetchVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FetchVariant::TemplateStructured => "template+json3",
            FetchVariant::SynthesizedStructured => "synthesized+json3",
            FetchVariant::TemplateDefault => "template",
            FetchVariant::SynthesizedDefault => "synthesized",
            FetchVariant::Proxied => "proxied",
        };
        write!(f, "{}", name)
    }
}

/// Raw caption body plus the variant that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPayload {
    pub variant: FetchVariant,
    pub body: String,
}

/// Retrieves caption payloads for a track descriptor
#[derive(Clone)]
pub struct CaptionFetcher {
    http: Arc<dyn CaptionHttp>,
    proxy: Option<Arc<dyn CaptionHttp>>,
    proxy_timeout: Duration,
    timedtext_url: String,
}

impl CaptionFetcher {
    pub fn new(http: Arc<dyn CaptionHttp>, timedtext_url: impl Into<String>) -> Self {
        Self {
            http,
            proxy: None,
            proxy_timeout: Duration::from_millis(5000),
            timedtext_url: timedtext_url.into(),
        }
    }

    /// Attach the alternate transport used after every direct variant fails
    pub fn with_proxy(mut self, proxy: Arc<dyn CaptionHttp>, timeout: Duration) -> Self {
        self.proxy = Some(proxy);
        self.proxy_timeout = timeout;
        self
    }

    /// Fetch the first non-empty payload for `descriptor`.
    ///
    /// Content is not validated here; the parser decides whether it is usable.
    pub async fn fetch(&self, descriptor: &CaptionTrackDescriptor, video_id: &str) -> Option<FetchedPayload> {
        let structured_template = with_structured_format(&descriptor.source_url_template);
        let variants = [
            (FetchVariant::TemplateStructured, structured_template.clone()),
            (
                FetchVariant::SynthesizedStructured,
                self.synthesized_url(video_id, descriptor, true),
            ),
            (
                FetchVariant::TemplateDefault,
                without_format(&descriptor.source_url_template),
            ),
            (
                FetchVariant::SynthesizedDefault,
                self.synthesized_url(video_id, descriptor, false),
            ),
        ];

        let mut tried: Vec<String> = Vec::new();
        for (variant, url) in variants {
            let url = match url {
                Some(url) => url,
                None => {
                    debug!("Skipping {} variant: could not build URL", variant);
                    continue;
                }
            };
            if tried.contains(&url) {
                debug!("Skipping {} variant: same URL already tried", variant);
                continue;
            }

            debug!("📡 Trying {} variant: {}", variant, truncate_url(&url));
            match self.http.get_text(&url).await.and_then(non_empty) {
                Ok(body) => {
                    info!("✅ Caption payload via {} variant ({} bytes)", variant, body.len());
                    return Some(FetchedPayload { variant, body });
                }
                Err(e) => debug!("{} variant failed: {}", variant, e),
            }
            tried.push(url);
        }

        self.fetch_proxied(structured_template).await
    }

    async fn fetch_proxied(&self, url: Option<String>) -> Option<FetchedPayload> {
        let proxy = self.proxy.as_ref()?;
        let url = url?;

        debug!("📡 Trying proxied variant: {}", truncate_url(&url));
        let result = match tokio::time::timeout(self.proxy_timeout, proxy.get_text(&url)).await {
            Ok(result) => result.and_then(non_empty),
            Err(_) => Err(CaptionError::Timeout(self.proxy_timeout)),
        };

        match result {
            Ok(body) => {
                info!("✅ Caption payload via proxied transport ({} bytes)", body.len());
                Some(FetchedPayload {
                    variant: FetchVariant::Proxied,
                    body,
                })
            }
            Err(e) => {
                warn!("⚠️ All caption fetch variants failed (last: {})", e);
                None
            }
        }
    }

    fn synthesized_url(&self, video_id: &str, descriptor: &CaptionTrackDescriptor, structured: bool) -> Option<String> {
        let mut params: Vec<(&str, &str)> = vec![("v", video_id), ("lang", descriptor.language_code.as_str())];
        if structured {
            params.push(("fmt", STRUCTURED_FORMAT));
        }
        if descriptor.kind == TrackKind::AutoGenerated {
            params.push(("kind", "asr"));
        }

        Url::parse_with_params(&self.timedtext_url, &params)
            .map(String::from)
            .ok()
    }
}

fn non_empty(body: String) -> Result<String, CaptionError> {
    if body.trim().is_empty() {
        Err(CaptionError::EmptyBody)
    } else {
        Ok(body)
    }
}

/// Add `fmt=json3` unless the URL already names a format
pub fn with_structured_format(template: &str) -> Option<String> {
    let mut url = Url::parse(template).ok()?;
    if url.query_pairs().any(|(k, _)| k == "fmt") {
        return Some(url.into());
    }
    url.query_pairs_mut().append_pair("fmt", STRUCTURED_FORMAT);
    Some(url.into())
}

/// Drop any `fmt` parameter so the endpoint answers in its default format
pub fn without_format(template: &str) -> Option<String> {
    let mut url = Url::parse(template).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers each URL containing a key with the mapped body; records every request
    struct ScriptedHttp {
        responses: Vec<(&'static str, Result<&'static str, u16>)>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedHttp {
        fn new(responses: Vec<(&'static str, Result<&'static str, u16>)>) -> Self {
            Self {
                responses,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CaptionHttp for ScriptedHttp {
        async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
            self.requests.lock().unwrap().push(url.to_string());
            for (needle, response) in &self.responses {
                if url.contains(needle) {
                    return response.map(str::to_string).map_err(CaptionError::Status);
                }
            }
            Err(CaptionError::Status(404))
        }

        async fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<String, CaptionError> {
            Err(CaptionError::Status(405))
        }
    }

    struct SlowHttp;

    #[async_trait]
    impl CaptionHttp for SlowHttp {
        async fn get_text(&self, _url: &str) -> Result<String, CaptionError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }

        async fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<String, CaptionError> {
            Err(CaptionError::Status(405))
        }
    }

    const TIMEDTEXT: &str = "https://www.youtube.com/api/timedtext";

    fn descriptor(kind: TrackKind) -> CaptionTrackDescriptor {
        CaptionTrackDescriptor {
            language_code: "en".to_string(),
            kind,
            source_url_template: "https://www.youtube.com/api/timedtext?v=abc&lang=en&signature=xyz".to_string(),
            name: None,
        }
    }

    #[test]
    fn test_structured_format_only_added_when_absent() {
        let added = with_structured_format("https://x.test/api/timedtext?v=a").unwrap();
        assert_eq!(added, "https://x.test/api/timedtext?v=a&fmt=json3");

        let kept = with_structured_format("https://x.test/api/timedtext?v=a&fmt=srv3").unwrap();
        assert_eq!(kept, "https://x.test/api/timedtext?v=a&fmt=srv3");
    }

    #[test]
    fn test_without_format_strips_fmt() {
        let stripped = without_format("https://x.test/api/timedtext?v=a&fmt=json3&lang=en").unwrap();
        assert_eq!(stripped, "https://x.test/api/timedtext?v=a&lang=en");

        let bare = without_format("https://x.test/api/timedtext?fmt=json3").unwrap();
        assert_eq!(bare, "https://x.test/api/timedtext");
    }

    #[tokio::test]
    async fn test_first_variant_wins() {
        let http = Arc::new(ScriptedHttp::new(vec![("signature=xyz&fmt=json3", Ok("{\"events\":[]}"))]));
        let fetcher = CaptionFetcher::new(http.clone(), TIMEDTEXT);

        let payload = fetcher.fetch(&descriptor(TrackKind::Standard), "abc").await.unwrap();
        assert_eq!(payload.variant, FetchVariant::TemplateStructured);
        assert_eq!(http.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_failed_variants_advance() {
        let http = Arc::new(ScriptedHttp::new(vec![
            ("signature=xyz&fmt=json3", Ok("   ")),
            ("fmt=json3&kind=asr", Err(500)),
            ("signature=xyz", Ok("<transcript><text start=\"0\">hi</text></transcript>")),
        ]));
        let fetcher = CaptionFetcher::new(http.clone(), TIMEDTEXT);

        let payload = fetcher.fetch(&descriptor(TrackKind::AutoGenerated), "abc").await.unwrap();
        assert_eq!(payload.variant, FetchVariant::TemplateDefault);

        let requests = http.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[1],
            "https://www.youtube.com/api/timedtext?v=abc&lang=en&fmt=json3&kind=asr"
        );
    }

    #[tokio::test]
    async fn test_proxy_used_after_direct_variants() {
        let direct = Arc::new(ScriptedHttp::new(Vec::new()));
        let proxy = Arc::new(ScriptedHttp::new(vec![("fmt=json3", Ok("{\"events\":[]}"))]));
        let fetcher = CaptionFetcher::new(direct.clone(), TIMEDTEXT)
            .with_proxy(proxy.clone(), Duration::from_millis(5000));

        let payload = fetcher.fetch(&descriptor(TrackKind::Standard), "abc").await.unwrap();
        assert_eq!(payload.variant, FetchVariant::Proxied);
        assert_eq!(direct.requests().len(), 4);
        assert_eq!(
            proxy.requests(),
            vec!["https://www.youtube.com/api/timedtext?v=abc&lang=en&signature=xyz&fmt=json3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_proxy_timeout_yields_nothing() {
        let direct = Arc::new(ScriptedHttp::new(Vec::new()));
        let fetcher = CaptionFetcher::new(direct, TIMEDTEXT)
            .with_proxy(Arc::new(SlowHttp), Duration::from_millis(50));

        assert!(fetcher.fetch(&descriptor(TrackKind::Standard), "abc").await.is_none());
    }

    #[tokio::test]
    async fn test_all_variants_fail_without_proxy() {
        let http = Arc::new(ScriptedHttp::new(Vec::new()));
        let fetcher = CaptionFetcher::new(http, TIMEDTEXT);
        assert!(fetcher.fetch(&descriptor(TrackKind::Standard), "abc").await.is_none());
    }
}
