// ABOUTME: Per-agent chat session — keeps the agent's own history so it holds its persona across turns.
// ABOUTME: Implements the prompt-in, fragments-out API binding on top of a ChatClient.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;

use crate::agent::provider::{ApiBinding, ApiError, ChatClient, ChatMessage, FragmentStream};

type History = Arc<Mutex<Vec<ChatMessage>>>;

fn lock(history: &History) -> MutexGuard<'_, Vec<ChatMessage>> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A prompt that has joined the history but whose reply has not.
///
/// Dropped before `complete`, it removes the prompt again: a rejected call,
/// a failed stream, and a stream abandoned on timeout or cancellation all
/// leave the history as it was before the call.
struct PendingReply {
    history: History,
    reply: String,
    completed: bool,
}

impl PendingReply {
    fn new(history: History) -> Self {
        Self {
            history,
            reply: String::new(),
            completed: false,
        }
    }

    fn complete(&mut self) {
        let reply = std::mem::take(&mut self.reply);
        lock(&self.history).push(ChatMessage::assistant(reply));
        self.completed = true;
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if !self.completed {
            let _ = lock(&self.history).pop();
        }
    }
}

/// Chat history for one agent plus the client that continues it.
///
/// Each prompt is recorded as a `user` message before the call; the reply is
/// recorded as an `assistant` message only once its stream completes.
pub struct ChatSession {
    client: Arc<dyn ChatClient>,
    history: History,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>, system_prompt: Option<&str>) -> Self {
        let history = system_prompt
            .filter(|s| !s.trim().is_empty())
            .map(|s| vec![ChatMessage::system(s)])
            .unwrap_or_default();
        Self {
            client,
            history: Arc::new(Mutex::new(history)),
        }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Snapshot of the history so far.
    pub fn history(&self) -> Vec<ChatMessage> {
        lock(&self.history).clone()
    }
}

#[async_trait]
impl ApiBinding for ChatSession {
    async fn stream_complete(&self, prompt: &str) -> Result<FragmentStream, ApiError> {
        let messages = {
            let mut history = lock(&self.history);
            history.push(ChatMessage::user(prompt));
            history.clone()
        };
        let mut pending = PendingReply::new(Arc::clone(&self.history));

        let mut inner = self.client.stream_chat(&messages).await?;

        Ok(Box::pin(async_stream::stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(fragment) => {
                        pending.reply.push_str(&fragment);
                        yield Ok(fragment);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            pending.complete();
        }))
    }
}
