// ABOUTME: OpenAI-compatible streaming chat client (OpenAI, OpenRouter, Ollama).
// ABOUTME: Posts to /chat/completions with stream=true and yields delta.content fragments.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::provider::{
    ApiError, ChatClient, ChatMessage, FragmentStream, classify_sse_error,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// What one SSE data payload contributes to the stream.
#[derive(Debug, PartialEq)]
enum ChunkOutcome {
    Text { text: String, finished: bool },
    Finished,
    Done,
    Empty,
}

fn parse_chunk(data: &str) -> Result<ChunkOutcome, ApiError> {
    let data = data.trim();
    if data == DONE_MARKER {
        return Ok(ChunkOutcome::Done);
    }
    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| ApiError::MalformedStream(format!("{e}: {data}")))?;
    if let Some(error) = chunk.error {
        return Err(ApiError::MalformedStream(format!("provider error: {error}")));
    }
    let mut text = String::new();
    let mut finished = false;
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            text.push_str(&content);
        }
        finished |= choice.finish_reason.is_some();
    }
    Ok(match (text.is_empty(), finished) {
        (false, finished) => ChunkOutcome::Text { text, finished },
        (true, true) => ChunkOutcome::Finished,
        (true, false) => ChunkOutcome::Empty,
    })
}

/// Streaming client for any endpoint speaking the OpenAI chat completions API.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, model: &str, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.to_string(),
            max_tokens,
        }
    }

    /// Read the API key from `key_var`; a missing key is an error.
    pub fn from_env(key_var: &str, model: &str, max_tokens: u32) -> Result<Self, ApiError> {
        let key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::Auth(format!("{key_var} is not set")))?;
        Ok(Self::new(Some(key), model, max_tokens))
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn build_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ApiError::Auth(format!("invalid API key header: {e}")))?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, ApiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            stream: true,
        };
        debug!(model = %self.model, message_count = messages.len(), "sending chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.build_headers()?)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        Ok(Box::pin(async_stream::stream! {
            let mut finished = false;
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(classify_sse_error(e));
                        return;
                    }
                };
                match parse_chunk(&event.data) {
                    Ok(ChunkOutcome::Text { text, finished: last }) => {
                        finished |= last;
                        yield Ok(text);
                    }
                    Ok(ChunkOutcome::Finished) => finished = true,
                    Ok(ChunkOutcome::Done) => return,
                    Ok(ChunkOutcome::Empty) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            if !finished {
                yield Err(ApiError::MalformedStream("stream ended before [DONE]".to_string()));
            }
        }))
    }
}
