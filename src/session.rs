use crate::llm::ChatMessage;
use crate::transcript::Transcript;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Identifies one navigation to a video.
///
/// Results carrying a ticket are only applied while that navigation is still the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    video_id: String,
    generation: u64,
}

impl SessionTicket {
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct SessionState {
    video_id: Option<String>,
    generation: u64,
    transcript: Option<Transcript>,
    chat_history: Vec<ChatMessage>,
}

/// State of the active page view: current video, its transcript and chat
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `video_id`, dropping everything held for the previous video
    pub async fn navigate(&self, video_id: impl Into<String>) -> SessionTicket {
        let video_id = video_id.into();
        let mut state = self.state.write().await;

        state.generation += 1;
        state.video_id = Some(video_id.clone());
        state.transcript = None;
        state.chat_history.clear();

        info!("🧭 Session now on video {} (generation {})", video_id, state.generation);
        SessionTicket {
            video_id,
            generation: state.generation,
        }
    }

    pub async fn is_current(&self, ticket: &SessionTicket) -> bool {
        let state = self.state.read().await;
        is_current_locked(&state, ticket)
    }

    pub async fn current_video(&self) -> Option<String> {
        self.state.read().await.video_id.clone()
    }

    /// Ticket of the active navigation, if any
    pub async fn current_ticket(&self) -> Option<SessionTicket> {
        let state = self.state.read().await;
        state.video_id.clone().map(|video_id| SessionTicket {
            video_id,
            generation: state.generation,
        })
    }

    /// Store a transcript for the ticket's video; `false` if the ticket is stale
    pub async fn apply_transcript(&self, ticket: &SessionTicket, transcript: Transcript) -> bool {
        let mut state = self.state.write().await;
        if !is_current_locked(&state, ticket) {
            debug!(
                "Ignoring transcript for {} (generation {}, now {})",
                ticket.video_id, ticket.generation, state.generation
            );
            return false;
        }
        state.transcript = Some(transcript);
        true
    }

    pub async fn current_transcript(&self) -> Option<Transcript> {
        self.state.read().await.transcript.clone()
    }

    /// Replace the chat history for the ticket's video; `false` if the ticket is stale
    pub async fn record_chat(&self, ticket: &SessionTicket, history: Vec<ChatMessage>) -> bool {
        let mut state = self.state.write().await;
        if !is_current_locked(&state, ticket) {
            return false;
        }
        state.chat_history = history;
        true
    }

    pub async fn chat_history(&self) -> Vec<ChatMessage> {
        self.state.read().await.chat_history.clone()
    }
}

fn is_current_locked(state: &SessionState, ticket: &SessionTicket) -> bool {
    state.generation == ticket.generation && state.video_id.as_deref() == Some(ticket.video_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    fn transcript(text: &str) -> Transcript {
        Transcript::new(vec![TranscriptSegment {
            start: 0.0,
            duration: 2.0,
            text: text.to_string(),
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn test_navigation_invalidates_old_tickets() {
        let session = SessionContext::new();
        let first = session.navigate("aaaaaaaaaaa").await;
        assert!(session.is_current(&first).await);

        let second = session.navigate("bbbbbbbbbbb").await;
        assert!(!session.is_current(&first).await);
        assert!(session.is_current(&second).await);
        assert_eq!(session.current_video().await.as_deref(), Some("bbbbbbbbbbb"));
    }

    #[tokio::test]
    async fn test_renavigating_same_video_is_a_new_generation() {
        let session = SessionContext::new();
        let first = session.navigate("aaaaaaaaaaa").await;
        let again = session.navigate("aaaaaaaaaaa").await;

        assert!(!session.apply_transcript(&first, transcript("old")).await);
        assert!(session.apply_transcript(&again, transcript("new")).await);
        assert_eq!(session.current_transcript().await.unwrap().full_text(), "new");
    }

    #[tokio::test]
    async fn test_navigation_resets_transcript_and_chat() {
        let session = SessionContext::new();
        let ticket = session.navigate("aaaaaaaaaaa").await;
        session.apply_transcript(&ticket, transcript("hello")).await;
        assert!(
            session
                .record_chat(
                    &ticket,
                    vec![ChatMessage {
                        role: "user".to_string(),
                        content: "hi".to_string()
                    }]
                )
                .await
        );
        assert_eq!(session.chat_history().await.len(), 1);

        let next = session.navigate("bbbbbbbbbbb").await;
        assert!(session.current_transcript().await.is_none());
        assert!(session.chat_history().await.is_empty());
        assert!(!session.record_chat(&ticket, Vec::new()).await);
        assert!(session.record_chat(&next, Vec::new()).await);
    }
}
