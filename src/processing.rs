use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::VideoCache;
use crate::config::Config;
use crate::llm::{ChatReply, TranscriptAssistant};
use crate::session::{SessionContext, SessionTicket};
use crate::transcript::{PageContext, PipelineState, Transcript, TranscriptPipeline};

/// Where a transcript came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSource {
    Cache,
    Strategy(String),
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Cache => write!(f, "cache"),
            TranscriptSource::Strategy(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcquiredTranscript {
    pub transcript: Transcript,
    pub source: TranscriptSource,
}

/// Ties the pipeline, the cache, the session and the AI assistant together
pub struct VideoProcessor {
    config: Config,
    pipeline: TranscriptPipeline,
    cache: Option<VideoCache>,
    session: SessionContext,
    assistant: Option<TranscriptAssistant>,
}

impl VideoProcessor {
    /// Build with reqwest transports and the configured cache
    pub fn new(config: Config, page: Option<Arc<dyn PageContext>>) -> Result<Self> {
        let pipeline = TranscriptPipeline::from_config(&config, page)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    pub fn with_pipeline(config: Config, pipeline: TranscriptPipeline) -> Self {
        let cache = config.cache.enabled.then(|| VideoCache::from_config(&config.cache));
        info!("🔧 Transcript strategies: {}", pipeline.strategy_names().join(" → "));
        Self {
            config,
            pipeline,
            cache,
            session: SessionContext::new(),
            assistant: None,
        }
    }

    pub fn with_assistant(mut self, assistant: TranscriptAssistant) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn cache(&self) -> Option<&VideoCache> {
        self.cache.as_ref()
    }

    /// Transcript for `video_id`, from the cache when allowed, else from the pipeline
    pub async fn transcript(&self, video_id: &str, use_cache: bool) -> Result<Option<AcquiredTranscript>> {
        let ticket = self.session.navigate(video_id).await;

        if use_cache {
            if let Some(transcript) = self.cached_transcript(video_id).await {
                info!("📚 Using cached transcript for {}", video_id);
                self.session.apply_transcript(&ticket, transcript.clone()).await;
                return Ok(Some(AcquiredTranscript {
                    transcript,
                    source: TranscriptSource::Cache,
                }));
            }
        }

        let (transcript, strategy) = match self.pipeline.load_into(&self.session, &ticket).await {
            PipelineState::Succeeded { transcript, strategy } => (transcript, strategy),
            _ => return Ok(None),
        };

        if !self.session.is_current(&ticket).await {
            debug!("Session moved on before {} finished loading", video_id);
        }

        // Cached under the id it was fetched for, whatever the session shows now
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store_transcript(video_id, &transcript).await {
                warn!("⚠️ Failed to cache transcript for {}: {}", video_id, e);
            }
        }

        Ok(Some(AcquiredTranscript {
            transcript,
            source: TranscriptSource::Strategy(strategy),
        }))
    }

    async fn cached_transcript(&self, video_id: &str) -> Option<Transcript> {
        let cache = self.cache.as_ref()?;
        match cache.get(video_id).await {
            Ok(entry) => entry.and_then(|e| e.transcript),
            Err(e) => {
                warn!("⚠️ Cache read failed for {}: {}", video_id, e);
                None
            }
        }
    }

    async fn require_transcript(&self, video_id: &str) -> Result<Transcript> {
        self.transcript(video_id, true)
            .await?
            .map(|acquired| acquired.transcript)
            .ok_or_else(|| anyhow!("No transcript available for this video"))
    }

    async fn assistant(&self) -> Result<AssistantRef<'_>> {
        match &self.assistant {
            Some(assistant) => Ok(AssistantRef::Borrowed(assistant)),
            None => Ok(AssistantRef::Owned(TranscriptAssistant::from_config(&self.config.llm).await?)),
        }
    }

    /// Summary for `video_id`; a cached summary is reused
    pub async fn summarize(&self, video_id: &str, title: Option<&str>) -> Result<String> {
        if let Some(cache) = &self.cache {
            if let Ok(Some(entry)) = cache.get(video_id).await {
                if let Some(summary) = entry.summary {
                    info!("📚 Using cached summary for {}", video_id);
                    return Ok(summary);
                }
            }
        }

        let transcript = self.require_transcript(video_id).await?;
        let summary = self.assistant().await?.get().summarize(&transcript, title).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store_summary(video_id, &summary).await {
                warn!("⚠️ Failed to cache summary for {}: {}", video_id, e);
            }
        }
        Ok(summary)
    }

    pub async fn key_points(&self, video_id: &str) -> Result<String> {
        let transcript = self.require_transcript(video_id).await?;
        self.assistant().await?.get().key_points(&transcript).await
    }

    pub async fn key_moments(&self, video_id: &str) -> Result<String> {
        let transcript = self.require_transcript(video_id).await?;
        self.assistant().await?.get().key_moments(&transcript).await
    }

    /// Ask a question about the video, continuing the stored conversation
    pub async fn chat(&self, video_id: &str, message: &str) -> Result<ChatReply> {
        let transcript = self.require_transcript(video_id).await?;
        let Some(ticket) = self.current_ticket(video_id).await else {
            return Err(anyhow!("Session changed while loading {}", video_id));
        };

        let history = match &self.cache {
            Some(cache) => cache.chat_history(video_id).await.unwrap_or_default(),
            None => self.session.chat_history().await,
        };

        let reply = self.assistant().await?.get().chat(&transcript, message, &history).await?;

        if self.session.record_chat(&ticket, reply.history.clone()).await {
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.save_chat_history(video_id, &reply.history).await {
                    warn!("⚠️ Failed to save chat history for {}: {}", video_id, e);
                }
            }
        }

        Ok(reply)
    }

    async fn current_ticket(&self, video_id: &str) -> Option<SessionTicket> {
        // `transcript()` navigated already; re-navigating would clear the transcript
        self.session
            .current_ticket()
            .await
            .filter(|ticket| ticket.video_id() == video_id)
    }
}

enum AssistantRef<'a> {
    Borrowed(&'a TranscriptAssistant),
    Owned(TranscriptAssistant),
}

impl AssistantRef<'_> {
    fn get(&self) -> &TranscriptAssistant {
        match self {
            AssistantRef::Borrowed(assistant) => assistant,
            AssistantRef::Owned(assistant) => assistant,
        }
    }
}
