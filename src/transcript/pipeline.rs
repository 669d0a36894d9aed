/// Ordered fallback chain over transcript strategies
use super::fetcher::CaptionFetcher;
use super::http::{CaptionHttp, ReqwestHttp};
use super::locator::CaptionLocator;
use super::service::TranscriptServiceClient;
use super::strategies::{
    CaptionExtractor, CurrentPageStrategy, FetchedPageStrategy, PageContext, TranscriptServiceStrategy,
    TranscriptStrategy,
};
use super::{CaptionError, Transcript};
use crate::config::Config;
use crate::session::{SessionContext, SessionTicket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a pipeline run is
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    NotStarted,
    TryingStrategy(usize),
    Succeeded { transcript: Transcript, strategy: String },
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded { .. } | PipelineState::Failed)
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            PipelineState::Succeeded { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    pub fn into_transcript(self) -> Option<Transcript> {
        match self {
            PipelineState::Succeeded { transcript, .. } => Some(transcript),
            _ => None,
        }
    }
}

/// Runs strategies in order until one yields a transcript
pub struct TranscriptPipeline {
    strategies: Vec<Box<dyn TranscriptStrategy>>,
}

impl TranscriptPipeline {
    pub fn new(strategies: Vec<Box<dyn TranscriptStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the standard chain: service (if configured), current page (if any), fetched page
    pub fn standard(
        config: &Config,
        http: Arc<dyn CaptionHttp>,
        proxy: Option<Arc<dyn CaptionHttp>>,
        page: Option<Arc<dyn PageContext>>,
    ) -> Self {
        let transcript_config = &config.transcript;
        let youtube = &config.youtube;

        let locator = CaptionLocator::new(http.clone(), youtube.clone());
        let mut fetcher = CaptionFetcher::new(http.clone(), youtube.timedtext_url.clone());
        if let Some(proxy) = proxy {
            fetcher = fetcher.with_proxy(proxy, Duration::from_millis(transcript_config.proxy_timeout_ms));
        }
        let extractor = CaptionExtractor::new(locator, fetcher);

        let mut strategies: Vec<Box<dyn TranscriptStrategy>> = Vec::new();

        if let Some(service_url) = &transcript_config.service_url {
            let client = TranscriptServiceClient::new(http.clone(), service_url.clone())
                .with_language(transcript_config.preferred_language.clone());
            strategies.push(Box::new(TranscriptServiceStrategy::new(client)));
        }

        if let Some(page) = page {
            strategies.push(Box::new(CurrentPageStrategy::new(
                page,
                extractor.clone(),
                Duration::from_millis(transcript_config.metadata_timeout_ms),
            )));
        }

        strategies.push(Box::new(FetchedPageStrategy::new(
            http,
            extractor,
            youtube.watch_url.clone(),
        )));

        Self::new(strategies)
    }

    /// Build the standard chain with reqwest transports from configuration
    pub fn from_config(config: &Config, page: Option<Arc<dyn PageContext>>) -> Result<Self, CaptionError> {
        let http: Arc<dyn CaptionHttp> = Arc::new(ReqwestHttp::new(&config.transcript)?);
        let proxy = match &config.transcript.proxy_url {
            Some(proxy_url) => {
                let proxy: Arc<dyn CaptionHttp> = Arc::new(ReqwestHttp::with_proxy(&config.transcript, proxy_url)?);
                Some(proxy)
            }
            None => None,
        };
        Ok(Self::standard(config, http, proxy, page))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain for `video_id` and return the terminal state
    pub async fn run(&self, video_id: &str) -> PipelineState {
        let mut state = PipelineState::NotStarted;
        info!("🔍 Starting transcript acquisition for: {}", video_id);

        for (index, strategy) in self.strategies.iter().enumerate() {
            state = PipelineState::TryingStrategy(index);
            debug!("Pipeline state: {:?} ({})", state, strategy.name());

            if let Some(transcript) = strategy.attempt(video_id).await {
                if !transcript.is_empty() {
                    info!(
                        "✅ Transcript via {}: {} segments, {} characters",
                        strategy.name(),
                        transcript.len(),
                        transcript.full_text().chars().count()
                    );
                    return PipelineState::Succeeded {
                        transcript,
                        strategy: strategy.name().to_string(),
                    };
                }
            }
            debug!("Strategy {} produced no transcript", strategy.name());
        }

        if state == PipelineState::NotStarted {
            warn!("⚠️ No transcript strategies configured");
        }
        warn!("❌ No transcript available for {}", video_id);
        PipelineState::Failed
    }

    /// Run for the ticket's video and hand the result to the session if it is still current
    pub async fn load_into(&self, session: &SessionContext, ticket: &SessionTicket) -> PipelineState {
        let state = self.run(ticket.video_id()).await;

        if let PipelineState::Succeeded { transcript, .. } = &state {
            if !session.apply_transcript(ticket, transcript.clone()).await {
                debug!("Discarded transcript for {}: session moved on", ticket.video_id());
            }
        }

        state
    }
}
