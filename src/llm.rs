//! OpenAI-compatible chat-completions client for topic extraction.
//!
//! Summaries are the only LLM use in the bot, so this stays a single
//! non-streaming call per transcript bucket.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{BotError, Result};
use crate::summary::TopicSource;

/// Instruction given to the model for each transcript bucket.
const TOPIC_SYSTEM_PROMPT: &str = "Extract topics from Matrix chat text.

You will receive plain text where most lines look like:
<sender>: <message>

Rules:
- Output only topic bullets, each starting with \"- \".
- Topic bullets must be short noun phrases, not full sentences.
- Keep each bullet under 12 words.
- Include only topics grounded in the input.
- Include URLs only if central to a topic.
- No preamble, headings, code fences, or extra commentary.
- Return 1 to 6 bullets.
";

const TEMPERATURE: f32 = 0.1;
const TOP_P: f32 = 0.9;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Topic extraction over an OpenAI-compatible chat-completions endpoint.
pub struct TopicExtractor {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl TopicExtractor {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Llm(format!("build HTTP client: {e}")))?;
        let endpoint = format!(
            "{}/chat/completions",
            config.api_url.trim().trim_end_matches('/')
        );
        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Ask the model for topic bullets covering `transcript`.
    pub async fn extract_topics(&self, transcript: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: TOPIC_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if !self.api_key.trim().is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| BotError::Llm(format!("chat completion request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Llm(format!(
                "chat completion failed with status {status}: {}",
                body.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BotError::Llm(format!("decode chat completion: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TopicSource for TopicExtractor {
    async fn topics(&self, transcript: &str) -> Result<String> {
        self.extract_topics(transcript).await
    }
}
