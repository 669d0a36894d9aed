/// YouTube AI Transcript - Rust Implementation
///
/// Resilient caption extraction for YouTube videos with AI summaries, key points,
/// key moments and transcript-grounded chat.

pub mod transcript;
pub mod session;
pub mod processing;
pub mod config;
pub mod cache;
pub mod llm;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::processing::{AcquiredTranscript, TranscriptSource, VideoProcessor};
pub use crate::session::{SessionContext, SessionTicket};
pub use crate::cache::{CacheStats, VideoCache};
pub use crate::transcript::{
    extract_video_id, format_timestamp, CaptionTrackDescriptor, PipelineState, Transcript, TranscriptPipeline,
    TranscriptSegment,
};
pub use crate::llm::{LLMConfig, LLMProvider, TranscriptAssistant};
