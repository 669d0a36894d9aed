/// AI operations over a transcript
use super::prompts::{PromptKind, PromptLibrary};
use super::{create_llm, ChatMessage, LLMConfig, LLM};
use crate::transcript::Transcript;
use anyhow::Result;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Appended when a transcript is cut to fit the prompt
pub const TRUNCATION_NOTICE: &str = "\n\n[Transcript truncated due to length]";

/// Reply the model gives after reading the chat context
const CHAT_ACKNOWLEDGEMENT: &str =
    "I have reviewed the video transcript and I'm ready to answer your questions about the content. What would you like to know?";

/// Cap `text` at `max_chars` characters, cutting at the last whitespace at or
/// before the cap and appending [`TRUNCATION_NOTICE`]
pub fn truncate_transcript(text: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cap, next)) = text.char_indices().nth(max_chars) else {
        return Cow::Borrowed(text);
    };

    let prefix = &text[..cap];
    let cut = if next.is_whitespace() {
        prefix.trim_end()
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(pos) => prefix[..pos].trim_end(),
            None => "",
        }
    };

    debug!("Truncated transcript from {} to {} bytes", text.len(), cut.len());
    Cow::Owned(format!("{}{}", cut, TRUNCATION_NOTICE))
}

/// Chat answer plus the history to keep for the next turn
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply: String,
    pub history: Vec<ChatMessage>,
}

/// Summaries, key points, key moments and chat for a transcript
pub struct TranscriptAssistant {
    llm: Box<dyn LLM>,
    prompts: PromptLibrary,
    max_transcript_chars: usize,
    history_limit: usize,
}

impl TranscriptAssistant {
    pub fn new(llm: Box<dyn LLM>, prompts: PromptLibrary, config: &LLMConfig) -> Self {
        Self {
            llm,
            prompts,
            max_transcript_chars: config.max_transcript_chars,
            history_limit: config.chat_history_limit,
        }
    }

    /// Build the configured provider and load prompt overrides
    pub async fn from_config(config: &LLMConfig) -> Result<Self> {
        let llm = create_llm(config)?;
        let prompts = PromptLibrary::load(config.prompt_dir.as_deref()).await;
        info!("🤖 AI assistant ready ({:?}, {})", config.provider, config.model);
        Ok(Self::new(llm, prompts, config))
    }

    /// Whether the provider answers with the configured credentials
    pub async fn check_provider(&self) -> bool {
        let available = self.llm.is_available().await;
        if !available {
            warn!("⚠️ {:?} provider is not reachable", self.llm.provider_type());
        }
        available
    }

    pub async fn summarize(&self, transcript: &Transcript, title: Option<&str>) -> Result<String> {
        info!("📝 Generating summary");
        self.complete(PromptKind::Summary, transcript.full_text(), title).await
    }

    pub async fn key_points(&self, transcript: &Transcript) -> Result<String> {
        info!("📌 Extracting key points");
        self.complete(PromptKind::KeyPoints, transcript.full_text(), None).await
    }

    /// Key moments work from the `[m:ss] text` form so the model can cite timestamps
    pub async fn key_moments(&self, transcript: &Transcript) -> Result<String> {
        info!("⏱️ Finding key moments");
        self.complete(PromptKind::KeyMoments, &transcript.timestamped_text(), None).await
    }

    /// Answer `message` about the transcript, continuing `history`
    pub async fn chat(&self, transcript: &Transcript, message: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        let text = truncate_transcript(transcript.full_text(), self.max_transcript_chars);
        let context = self.prompts.render(PromptKind::Chat, &text, None);

        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::user(context));
        messages.push(ChatMessage::assistant(CHAT_ACKNOWLEDGEMENT));
        messages.extend(history.iter().map(|m| {
            if m.role == "user" {
                ChatMessage::user(m.content.clone())
            } else {
                ChatMessage::assistant(m.content.clone())
            }
        }));
        messages.push(ChatMessage::user(message));

        debug!("Chat request with {} prior message(s)", history.len());
        let response = self.llm.chat(messages).await?;

        let mut updated = history.to_vec();
        updated.push(ChatMessage::user(message));
        updated.push(ChatMessage::assistant(response.content.clone()));
        if updated.len() > self.history_limit {
            updated.drain(..updated.len() - self.history_limit);
        }

        Ok(ChatReply {
            reply: response.content,
            history: updated,
        })
    }

    async fn complete(&self, kind: PromptKind, text: &str, title: Option<&str>) -> Result<String> {
        let text = truncate_transcript(text, self.max_transcript_chars);
        let prompt = self.prompts.render(kind, &text, title);
        let response = self.llm.chat(vec![ChatMessage::user(prompt)]).await?;
        if let Some(tokens) = response.tokens_used {
            debug!("{:?} used {} tokens", kind, tokens);
        }
        Ok(response.content)
    }
}
