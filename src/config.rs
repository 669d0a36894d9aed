use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::llm::{LLMConfig, LLMProvider};

/// Configuration for yt-ai
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Transcript acquisition settings
    pub transcript: TranscriptConfig,

    /// YouTube endpoints
    pub youtube: YouTubeConfig,

    /// AI provider and assistant settings
    pub llm: LLMConfig,

    /// Local video cache
    pub cache: CacheConfig,

    /// Transcript server settings
    pub server: ServerConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Base URL of an external transcript service; `None` skips that strategy
    pub service_url: Option<String>,

    /// Per-request HTTP timeout (seconds)
    pub request_timeout_seconds: u64,

    /// Bound on player metadata retrieval from the current page (milliseconds)
    pub metadata_timeout_ms: u64,

    /// Bound on the proxied caption fetch (milliseconds)
    pub proxy_timeout_ms: u64,

    /// Alternate transport for caption fetches
    pub proxy_url: Option<String>,

    /// Extra `Cookie` header sent with every request
    pub cookie_header: Option<String>,

    /// User agent for page and caption requests
    pub user_agent: String,

    /// Language requested from the transcript service
    pub preferred_language: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            service_url: Some("http://127.0.0.1:5050".to_string()),
            request_timeout_seconds: 15,
            metadata_timeout_ms: 2000,
            proxy_timeout_ms: 5000,
            proxy_url: None,
            cookie_header: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            preferred_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Watch page, queried with `?v=`
    pub watch_url: String,

    /// Caption endpoint used for synthesized URLs
    pub timedtext_url: String,

    /// Player metadata API (JSON POST)
    pub player_api_url: String,

    /// Web client version reported to the player API
    pub client_version: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            watch_url: "https://www.youtube.com/watch".to_string(),
            timedtext_url: "https://www.youtube.com/api/timedtext".to_string(),
            player_api_url: "https://www.youtube.com/youtubei/v1/player?prettyPrint=false".to_string(),
            client_version: "2.20240101.00.00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Read and write the cache
    pub enabled: bool,

    /// Directory holding `video_cache.json`
    pub cache_dir: PathBuf,

    /// Entries kept before least-recently-accessed eviction
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from("./cache"),
            max_entries: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Languages tried after the requested one
    pub fallback_languages: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5050,
            fallback_languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first readable config file, else defaults;
    /// environment overrides apply either way
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if let Ok(config_str) = std::fs::read_to_string(&path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env_overrides();
        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("yt-ai.toml"), PathBuf::from("config/yt-ai.toml")];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/yt-ai/config.toml"));
        }
        paths
    }

    /// Defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(service_url) = std::env::var("YT_AI_SERVICE_URL") {
            // An empty value disables the service strategy
            self.transcript.service_url = Some(service_url).filter(|s| !s.trim().is_empty());
        }

        if let Ok(api_key) = std::env::var("YT_AI_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(cache_dir) = std::env::var("YT_AI_CACHE_DIR") {
            self.cache.cache_dir = PathBuf::from(cache_dir);
        }

        if let Ok(log_level) = std::env::var("YT_AI_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        if let Ok(proxy_url) = std::env::var("YT_AI_PROXY_URL") {
            self.transcript.proxy_url = Some(proxy_url);
        }

        if let Ok(cookie) = std::env::var("YT_AI_COOKIE") {
            self.transcript.cookie_header = Some(cookie);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcript.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if self.cache.max_entries == 0 {
            return Err(anyhow!("cache.max_entries must be greater than 0"));
        }

        if self.llm.max_transcript_chars == 0 {
            return Err(anyhow!("llm.max_transcript_chars must be greater than 0"));
        }

        let urls = [
            ("transcript.service_url", self.transcript.service_url.as_deref()),
            ("transcript.proxy_url", self.transcript.proxy_url.as_deref()),
            ("youtube.watch_url", Some(self.youtube.watch_url.as_str())),
            ("youtube.timedtext_url", Some(self.youtube.timedtext_url.as_str())),
            ("youtube.player_api_url", Some(self.youtube.player_api_url.as_str())),
        ];
        for (name, value) in urls {
            if let Some(value) = value {
                url::Url::parse(value).map_err(|e| anyhow!("{} is not a valid URL ({}): {}", name, value, e))?;
            }
        }

        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must not be empty"));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "yt-ai Configuration:\n\
            - Transcript Service: {}\n\
            - Proxy: {}\n\
            - Request Timeout: {}s\n\
            - AI Provider: {:?} ({})\n\
            - Transcript Limit: {} chars\n\
            - Cache: {} ({}, max {} entries)\n\
            - Server: {}:{}",
            self.transcript.service_url.as_deref().unwrap_or("disabled"),
            self.transcript.proxy_url.as_deref().unwrap_or("none"),
            self.transcript.request_timeout_seconds,
            self.llm.provider,
            self.llm.model,
            self.llm.max_transcript_chars,
            if self.cache.enabled { "enabled" } else { "disabled" },
            self.cache.cache_dir.display(),
            self.cache.max_entries,
            self.server.host,
            self.server.port
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_service_url(mut self, service_url: Option<String>) -> Self {
        self.config.transcript.service_url = service_url;
        self
    }

    pub fn with_proxy_url(mut self, proxy_url: String) -> Self {
        self.config.transcript.proxy_url = Some(proxy_url);
        self
    }

    pub fn with_cookie_header(mut self, cookie: String) -> Self {
        self.config.transcript.cookie_header = Some(cookie);
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.config.transcript.request_timeout_seconds = seconds;
        self
    }

    pub fn with_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.cache_dir = dir;
        self
    }

    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.config.cache.enabled = enable;
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
