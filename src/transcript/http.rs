/// HTTP transport used by the caption pipeline
use super::CaptionError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TranscriptConfig;

/// Minimal HTTP surface the pipeline needs.
///
/// Non-success statuses are reported as `CaptionError::Status`; an empty body on a
/// successful response is returned as an empty string and judged by the caller.
#[async_trait]
pub trait CaptionHttp: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, CaptionError>;
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CaptionError>;
}

/// reqwest-backed transport with a cookie store, so caption requests carry the
/// same session cookies the watch page handed out
#[derive(Clone)]
pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    /// Create the default transport from transcript settings
    pub fn new(config: &TranscriptConfig) -> Result<Self, CaptionError> {
        let client = Self::builder(config).build()?;
        Ok(Self { client })
    }

    /// Create the alternate transport routed through `proxy_url`
    pub fn with_proxy(config: &TranscriptConfig, proxy_url: &str) -> Result<Self, CaptionError> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Self::builder(config).proxy(proxy).build()?;
        Ok(Self { client })
    }

    fn builder(config: &TranscriptConfig) -> reqwest::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        if let Some(cookie) = &config.cookie_header {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => warn!("Ignoring invalid cookie header: {}", e),
            }
        }

        Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .default_headers(headers)
    }
}

#[async_trait]
impl CaptionHttp for ReqwestHttp {
    async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("GET {} -> {}", truncate_url(url), status);

        if !status.is_success() {
            return Err(CaptionError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CaptionError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        debug!("POST {} -> {}", truncate_url(url), status);

        if !status.is_success() {
            return Err(CaptionError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Shorten a URL for log output
pub fn truncate_url(url: &str) -> String {
    const MAX: usize = 120;
    if url.chars().count() <= MAX {
        url.to_string()
    } else {
        format!("{}...", url.chars().take(MAX).collect::<String>())
    }
}
