/// Prompt templates for transcript tasks
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const SUMMARY_TEMPLATE: &str = "You are an expert content summarizer. Please provide a concise but comprehensive summary of the following YouTube video transcript.

{title}Transcript:
{transcript}

Please provide:
1. A brief overview (2-3 sentences)
2. Main topics covered
3. Key conclusions or takeaways

Format the response in a clear, readable manner using markdown.";

const KEY_POINTS_TEMPLATE: &str = "Analyze the following YouTube video transcript and extract the most important key points.

Transcript:
{transcript}

Please provide:
- 5-10 key points that capture the essential information
- Each point should be concise but informative
- Order them by importance or chronologically as appropriate

Format as a bulleted list using markdown.";

const KEY_MOMENTS_TEMPLATE: &str = "Analyze the following timestamped YouTube video transcript and identify the most important moments.

Transcript with timestamps:
{transcript}

Please identify 5-10 key moments in the video with their timestamps. For each moment:
- Include the exact timestamp from the transcript
- Provide a brief description of what happens at that point
- Explain why this moment is significant

Format each entry as:
**[TIMESTAMP]** - Description of the key moment

List them in chronological order.";

const CHAT_TEMPLATE: &str = "You are a helpful assistant that answers questions about a YouTube video based on its transcript. You have access to the full transcript and should provide accurate, helpful responses based on the video content.

Video Transcript:
{transcript}

---

When answering:
- Reference specific parts of the transcript when relevant
- If the question cannot be answered from the transcript, say so
- Be concise but thorough
- Include timestamps if they help answer the question";

/// The transcript tasks that have a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Summary,
    KeyPoints,
    KeyMoments,
    Chat,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::Summary,
        PromptKind::KeyPoints,
        PromptKind::KeyMoments,
        PromptKind::Chat,
    ];

    /// Override file name inside the prompt directory
    pub fn file_name(&self) -> &'static str {
        match self {
            PromptKind::Summary => "summary.txt",
            PromptKind::KeyPoints => "key_points.txt",
            PromptKind::KeyMoments => "key_moments.txt",
            PromptKind::Chat => "chat.txt",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            PromptKind::Summary => SUMMARY_TEMPLATE,
            PromptKind::KeyPoints => KEY_POINTS_TEMPLATE,
            PromptKind::KeyMoments => KEY_MOMENTS_TEMPLATE,
            PromptKind::Chat => CHAT_TEMPLATE,
        }
    }
}

/// Prompt templates, built in unless overridden from a directory.
///
/// `{transcript}` is replaced by the transcript text; `{title}` by
/// `Video Title: <title>` plus a blank line, or nothing.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    overrides: HashMap<PromptKind, String>,
}

impl PromptLibrary {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load overrides from `prompt_dir`; missing files keep the built-in template
    pub async fn load(prompt_dir: Option<&Path>) -> Self {
        let mut library = Self::default();
        let Some(dir) = prompt_dir else {
            return library;
        };

        for kind in PromptKind::ALL {
            let path = dir.join(kind.file_name());
            match tokio::fs::read_to_string(&path).await {
                Ok(content) if !content.trim().is_empty() => {
                    info!("📄 Using prompt override: {}", path.display());
                    library.overrides.insert(kind, content.trim().to_string());
                }
                Ok(_) => debug!("Ignoring empty prompt file {}", path.display()),
                Err(_) => debug!("No prompt override at {}", path.display()),
            }
        }

        library
    }

    pub fn template(&self, kind: PromptKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.builtin())
    }

    pub fn render(&self, kind: PromptKind, transcript: &str, title: Option<&str>) -> String {
        let title_block = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("Video Title: {}\n\n", t))
            .unwrap_or_default();

        // Title first so a transcript containing "{title}" is left alone
        self.template(kind)
            .replace("{title}", &title_block)
            .replace("{transcript}", transcript)
    }
}
