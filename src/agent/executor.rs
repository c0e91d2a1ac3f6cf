// ABOUTME: Turn executor — one agent's "send prompt, get full response, report it" operation.
// ABOUTME: Wraps the agent identity and binding; records each completed turn before returning it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::provider::ApiBinding;
use crate::agent::stream::aggregate;
use crate::console::LiveOutput;
use crate::conversation::{DisplayColor, Turn};
use crate::error::ConversationError;
use crate::transcript::TranscriptSink;

/// One conversational participant. Immutable once built.
pub struct Agent {
    pub name: String,
    pub color: DisplayColor,
    /// Introduction template: `{0}` is this agent, `{1}` the partner.
    pub template: String,
    binding: Box<dyn ApiBinding>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        color: DisplayColor,
        template: impl Into<String>,
        binding: Box<dyn ApiBinding>,
    ) -> Self {
        Self {
            name: name.into(),
            color,
            template: template.into(),
            binding,
        }
    }
}

/// Downstream handles a turn reports into.
pub struct TurnContext<'a> {
    pub transcript: &'a mut dyn TranscriptSink,
    pub live: &'a mut dyn LiveOutput,
    pub cancel: &'a CancellationToken,
}

/// Executes turns for a single agent.
pub struct TurnExecutor {
    agent: Agent,
    idle_timeout: Option<Duration>,
}

impl TurnExecutor {
    pub fn new(agent: Agent, idle_timeout: Option<Duration>) -> Self {
        Self {
            agent,
            idle_timeout,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Send a fully formed prompt and return the completed turn for `round`.
    ///
    /// The turn is handed to the transcript sink before it is returned. A
    /// failing sink is logged and does not fail the turn. Errors from the
    /// call propagate unchanged and nothing is recorded.
    pub async fn send(
        &self,
        prompt: &str,
        round: u32,
        ctx: &mut TurnContext<'_>,
    ) -> Result<Turn, ConversationError> {
        ctx.live
            .turn_started(&self.agent.name, self.agent.color, round);
        let result = aggregate(
            self.agent.binding.as_ref(),
            prompt,
            &mut *ctx.live,
            self.idle_timeout,
            ctx.cancel,
        )
        .await;
        ctx.live.turn_finished();

        let turn = Turn {
            round,
            agent: self.agent.name.clone(),
            text: result?,
            color: self.agent.color,
        };

        if let Err(e) = ctx.transcript.record(&turn) {
            warn!(agent = %turn.agent, round, error = %e, "failed to record turn");
        }
        info!(agent = %turn.agent, round, chars = turn.text.len(), "turn recorded");
        Ok(turn)
    }
}
