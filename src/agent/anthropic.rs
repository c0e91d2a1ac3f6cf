// ABOUTME: Anthropic Messages API streaming client.
// ABOUTME: Posts to /v1/messages with stream=true and yields text_delta fragments until message_stop.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::provider::{
    ApiError, ChatClient, ChatMessage, ChatRole, FragmentStream, classify_sse_error,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

fn parse_event(data: &str) -> Result<SseEvent, ApiError> {
    let event: SseEvent = serde_json::from_str(data)
        .map_err(|e| ApiError::MalformedStream(format!("{e}: {data}")))?;
    if let SseEvent::Error { error } = &event {
        return Err(ApiError::MalformedStream(format!(
            "{}: {}",
            error.kind, error.message
        )));
    }
    Ok(event)
}

/// Streaming client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    /// Build a client from `ANTHROPIC_API_KEY`.
    pub fn from_env(model: &str, max_tokens: u32) -> Result<Self, ApiError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::Auth("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::new(&key, model, max_tokens))
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn build_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| ApiError::Auth(format!("invalid API key header: {e}")))?;
        let _ = headers.insert("x-api-key", key);
        Ok(headers)
    }

    /// System messages travel in the top-level `system` field, not the message list.
    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .collect(),
            stream: true,
        }
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = self.build_request(messages);
        debug!(
            model = %self.model,
            message_count = request.messages.len(),
            has_system = request.system.is_some(),
            "sending messages request"
        );

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
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(classify_sse_error(e));
                        return;
                    }
                };
                match parse_event(&event.data) {
                    Ok(SseEvent::ContentBlockDelta { delta: Delta::TextDelta { text } }) => {
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Ok(SseEvent::MessageStop) => return,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Err(ApiError::MalformedStream("stream ended before message_stop".to_string()));
        }))
    }
}
