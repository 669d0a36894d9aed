use super::{ChatMessage, LLM, LLMConfig, LLMProvider, LLMResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const LMSTUDIO_CHAT_URL: &str = "http://localhost:1234/v1/chat/completions";

fn http_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

/// Pull `error.message` out of an API error body, else return the body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ---- OpenAI-compatible chat completions (LM Studio, OpenAI) ----

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    total_tokens: u32,
}

async fn chat_completion(
    client: &reqwest::Client,
    config: &LLMConfig,
    url: &str,
    messages: Vec<ChatMessage>,
    provider: &str,
) -> Result<LLMResponse> {
    let request = CompletionRequest {
        model: &config.model,
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    debug!("Sending request to {} at {}", provider, url);

    let mut builder = client.post(url).json(&request);
    if let Some(api_key) = &config.api_key {
        builder = builder.bearer_auth(api_key);
    }
    let response = builder.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} API error {}: {}", provider, status, api_error_message(&text)));
    }

    let completion: CompletionResponse = response.json().await?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No response from {}", provider))?
        .message
        .content;

    Ok(LLMResponse {
        content,
        tokens_used: completion.usage.map(|u| u.total_tokens),
    })
}

/// LM Studio (local OpenAI-compatible server)
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(LMSTUDIO_CHAT_URL)
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        chat_completion(&self.client, &self.config, self.endpoint(), messages, "LMStudio").await
    }

    async fn is_available(&self) -> bool {
        let models_endpoint = self.endpoint().replace("/chat/completions", "/models");
        match self.client.get(&models_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// OpenAI chat completions
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(OPENAI_CHAT_URL)
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        chat_completion(&self.client, &self.config, self.endpoint(), messages, "OpenAI").await
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = &self.config.api_key else {
            return false;
        };
        let models_endpoint = self.endpoint().replace("/chat/completions", "/models");
        match self.client.get(&models_endpoint).bearer_auth(api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

// ---- Gemini generateContent ----

const GEMINI_SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    total_token_count: u32,
}

/// Map chat roles onto Gemini's `user` / `model` turns; system text becomes a user turn
fn gemini_contents(messages: Vec<ChatMessage>) -> Vec<GeminiContent> {
    messages
        .into_iter()
        .map(|msg| {
            let role = match msg.role.as_str() {
                "assistant" | "model" => "model",
                _ => "user",
            };
            GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart { text: msg.content }],
            }
        })
        .collect()
}

/// Google Gemini provider
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Gemini API key required"));
        }
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    fn api_base(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/')
    }

    fn request(&self, messages: Vec<ChatMessage>) -> GeminiRequest {
        GeminiRequest {
            contents: gemini_contents(messages),
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: self.config.max_tokens,
            },
            safety_settings: GEMINI_SAFETY_CATEGORIES
                .iter()
                .map(|&category| GeminiSafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let url = format!("{}/models/{}:generateContent", self.api_base(), self.config.model);
        let request = self.request(messages);

        debug!("Sending {} turn(s) to Gemini model {}", request.contents.len(), self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, api_error_message(&text)));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        if let Some(reason) = gemini_response.prompt_feedback.and_then(|f| f.block_reason) {
            warn!("Gemini blocked the prompt: {}", reason);
            return Err(anyhow!("Gemini blocked the request: {}", reason));
        }

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No response from Gemini"))?;

        let content = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "Gemini returned no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                )
            })?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = &self.config.api_key else {
            return false;
        };
        let url = format!("{}/models", self.api_base());
        match self.client.get(&url).header("x-goog-api-key", api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_roles() {
        let contents = gemini_contents(vec![
            ChatMessage {
                role: "system".to_string(),
                content: "context".to_string(),
            },
            ChatMessage::assistant("ready"),
            ChatMessage::user("question"),
        ]);
        let roles: Vec<_> = contents.iter().map(|c| c.role.as_deref().unwrap_or_default()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(contents[1].parts[0].text, "ready");
    }

    #[test]
    fn test_gemini_request_shape() {
        let provider = GeminiProvider::new(LLMConfig {
            api_key: Some("k".to_string()),
            ..LLMConfig::default()
        })
        .unwrap();

        let json = serde_json::to_value(provider.request(vec![ChatMessage::user("hi")])).unwrap();
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(api_error_message(r#"{"error":{"message":"API key not valid"}}"#), "API key not valid");
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }
}
