// ABOUTME: App orchestrator — wires config, API bindings, transcript sinks, console, and the engine.
// ABOUTME: Owns the run lifecycle: Ctrl-C cancellation, transcript close, and the run summary.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{self, Agent, ChatSession, TurnExecutor};
use crate::config::{AgentConfig, Config, LlmConfig};
use crate::console::ConsoleOutput;
use crate::conversation::{ConversationEngine, EngineSettings};
use crate::transcript::{
    self, JsonlTranscript, MarkdownTranscript, RunSummary, TranscriptFanout, save_summary_to,
};

/// Top-level application that orchestrates all subsystems.
pub struct App {
    config: Config,
}

impl App {
    /// Create a new app with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run one conversation to completion, failure, or cancellation.
    pub async fn run(self) -> anyhow::Result<()> {
        // Load local .env if present, then the per-user secrets file.
        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_path(Config::secrets_env_path());

        let config = self.config;
        config.validate()?;

        let idle_timeout = idle_timeout(&config.llm);
        let a = build_executor(&config.llm, &config.agents.a, idle_timeout)?;
        let b = build_executor(&config.llm, &config.agents.b, idle_timeout)?;
        let names = [a.agent().name.clone(), b.agent().name.clone()];

        let dir = config.transcript.resolved_dir();
        let stamp = transcript::run_stamp();
        let sink = build_transcript(&config, &dir, &stamp)?;

        let settings = EngineSettings {
            rounds: config.conversation.rounds,
            start_order: config.conversation.start_order,
            opening: config.conversation.opening,
            reminder: config.reminder.clone(),
            subject: config.conversation.subject.clone(),
        };

        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn(watch_interrupt(cancel.clone()));

        let mut summary = RunSummary::begin(
            [names[0].as_str(), names[1].as_str()],
            [
                agent_model(&config.llm, &config.agents.a),
                agent_model(&config.llm, &config.agents.b),
            ],
            config.conversation.rounds,
        );
        let mut engine = ConversationEngine::new(
            a,
            b,
            settings,
            Box::new(sink),
            Box::new(ConsoleOutput::stdout()),
        )?
        .with_cancellation(cancel);

        let result = engine.run().await;
        interrupt.abort();

        let outcome = match &result {
            Ok(_) => "completed".to_string(),
            Err(e) => e.to_string(),
        };
        summary.finish(engine.turns_recorded(), outcome);
        let summary_path = transcript::summary::summary_path(&dir, &stamp);
        if let Err(e) = save_summary_to(&summary_path, &summary) {
            warn!(path = %summary_path.display(), error = %e, "failed to save run summary");
        }

        let report = result?;
        info!(dir = %dir.display(), "transcripts written");
        println!();
        println!(
            "Conversation complete: {} turns over {} rounds. Transcripts in {}",
            report.turns_recorded,
            report.rounds_completed,
            dir.display()
        );
        Ok(())
    }
}

fn idle_timeout(llm: &LlmConfig) -> Option<Duration> {
    (llm.timeout_seconds > 0).then(|| Duration::from_secs(llm.timeout_seconds))
}

/// The agent's own model if set, else the shared `llm.model`.
fn agent_model<'a>(llm: &'a LlmConfig, agent: &'a AgentConfig) -> &'a str {
    agent
        .model
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(&llm.model)
}

/// Build one agent's executor: its own client (honoring a per-agent model)
/// wrapped in a chat session that carries the agent's history.
fn build_executor(
    llm: &LlmConfig,
    agent: &AgentConfig,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<TurnExecutor> {
    let client = agent::create_client(llm, agent_model(llm, agent))?;
    let session = ChatSession::new(client, agent.system_prompt.as_deref());
    Ok(TurnExecutor::new(
        Agent::new(
            agent.name.trim(),
            agent.color,
            agent.template.clone(),
            Box::new(session),
        ),
        idle_timeout,
    ))
}

/// Open every enabled transcript format for this run.
fn build_transcript(config: &Config, dir: &Path, stamp: &str) -> anyhow::Result<TranscriptFanout> {
    let mut fanout = TranscriptFanout::new();
    if config.transcript.jsonl {
        fanout.push(Box::new(JsonlTranscript::create_in_dir(dir, stamp)?));
    }
    if config.transcript.markdown {
        fanout.push(Box::new(MarkdownTranscript::create_in_dir(
            dir,
            stamp,
            [config.agents.a.name.trim(), config.agents.b.name.trim()],
            config.conversation.subject.as_deref(),
        )?));
    }
    if fanout.is_empty() {
        warn!("all transcript formats disabled; turns will not be recorded");
    }
    Ok(fanout)
}

async fn watch_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling conversation");
        cancel.cancel();
    }
}
