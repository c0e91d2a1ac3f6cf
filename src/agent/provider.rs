// ABOUTME: LLM provider layer — streaming chat client trait, shared types, and the client factory.
// ABOUTME: Supports anthropic, openai, openrouter, and ollama (OpenAI-compatible) endpoints.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::EventStreamError;
use futures::Stream;
use serde::Serialize;

use crate::agent::anthropic::AnthropicClient;
use crate::agent::openai::OpenAiClient;
use crate::config::LlmConfig;

/// Incremental text fragments from one API call, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Failure of a single API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed stream: {0}")]
    MalformedStream(String),
}

impl ApiError {
    /// Map a non-success HTTP response to an error, reading its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 401 || status == 403 {
            Self::Auth(format!("HTTP {status}: {body}"))
        } else {
            Self::Status { status, body }
        }
    }
}

/// Split SSE transport failures from parser failures.
pub(crate) fn classify_sse_error(err: EventStreamError<reqwest::Error>) -> ApiError {
    match err {
        EventStreamError::Transport(e) => ApiError::Transport(e),
        other => ApiError::MalformedStream(other.to_string()),
    }
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of chat history sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A provider endpoint that streams a completion for a chat history.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn model(&self) -> &str;

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, ApiError>;
}

/// The per-agent binding the conversation engine talks to: one prompt in,
/// one finite, non-restartable fragment stream out.
#[async_trait]
pub trait ApiBinding: Send + Sync {
    async fn stream_complete(&self, prompt: &str) -> Result<FragmentStream, ApiError>;
}

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

fn base_url_override(config: &LlmConfig) -> Option<&str> {
    config.base_url.as_deref().filter(|s| !s.is_empty())
}

/// Create an LLM client for `model` based on the provider name in config.
pub fn create_client(config: &LlmConfig, model: &str) -> anyhow::Result<Arc<dyn ChatClient>> {
    match config.provider.as_str() {
        "anthropic" => {
            let mut client = AnthropicClient::from_env(model, config.max_tokens)?;
            if let Some(url) = base_url_override(config) {
                client = client.with_base_url(url);
            }
            Ok(Arc::new(client))
        }
        "openai" => {
            let mut client = OpenAiClient::from_env("OPENAI_API_KEY", model, config.max_tokens)?;
            if let Some(url) = base_url_override(config) {
                client = client.with_base_url(url);
            }
            Ok(Arc::new(client))
        }
        "openrouter" => {
            let url = base_url_override(config).unwrap_or(OPENROUTER_BASE_URL);
            let client = OpenAiClient::from_env("OPENROUTER_API_KEY", model, config.max_tokens)?
                .with_base_url(url);
            Ok(Arc::new(client))
        }
        "ollama" => {
            let base_url = format!("{}/v1", config.ollama.base_url.trim_end_matches('/'));
            let client = OpenAiClient::new(None, model, config.max_tokens).with_base_url(&base_url);
            Ok(Arc::new(client))
        }
        other => anyhow::bail!(
            "Unknown LLM provider: '{}'. Expected: anthropic, openai, openrouter, ollama",
            other
        ),
    }
}
