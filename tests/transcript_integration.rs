// ABOUTME: Integration tests for configuration loading and on-disk transcripts.
// ABOUTME: Runs a short conversation into JSONL and Markdown files and checks what lands on disk.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use duologue::agent::{Agent, ApiBinding, ApiError, FragmentStream, TurnExecutor};
use duologue::config::Config;
use duologue::console::NullOutput;
use duologue::conversation::{ConversationEngine, EngineSettings};
use duologue::error::ConversationError;
use duologue::transcript::jsonl::LogEntry;
use duologue::transcript::{JsonlTranscript, MarkdownTranscript, TranscriptFanout};

struct Counter {
    name: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl ApiBinding for Counter {
    async fn stream_complete(&self, _prompt: &str) -> Result<FragmentStream, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let items: Vec<Result<String, ApiError>> = vec![Ok(format!("{} says {}", self.name, n))];
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn executor(config: &duologue::config::AgentConfig, name: &'static str) -> TurnExecutor {
    let binding = Counter {
        name,
        calls: AtomicUsize::new(0),
    };
    TurnExecutor::new(
        Agent::new(
            config.name.clone(),
            config.color,
            config.template.clone(),
            Box::new(binding),
        ),
        None,
    )
}

#[test]
fn config_file_round_trips_into_settings() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[conversation]
rounds = 4
start_order = "b"
opening = "own-intro"
subject = "tide pools"

[reminder]
text = "Keep it short."
interval = 2

[agents.a]
name = "Ada"
color = "yellow"
template = "I am {0}. Meet {1}. Topic: {subject}."

[agents.b]
name = "Blaise"
template = "{0} here, hello {1}."
"#,
    )
    .unwrap();

    let mut config = Config::load_from(&path).unwrap();
    config.apply_overrides(Some(6), Some(tmp.path().join("out")));
    config.validate().unwrap();

    assert_eq!(config.conversation.rounds, 6);
    assert_eq!(config.conversation.subject.as_deref(), Some("tide pools"));
    assert_eq!(config.reminder.interval, 2);
    assert_eq!(config.agents.a.color.as_str(), "yellow");
    assert_eq!(config.transcript.resolved_dir(), tmp.path().join("out"));
    assert_eq!(config.llm.max_tokens, 1024);
}

#[test]
fn template_without_partner_placeholder_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        "[agents.a]\nname = \"Ada\"\ntemplate = \"I am {0}.\"\n",
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    match config.validate() {
        Err(ConversationError::ConfigurationInvalid { field }) => {
            assert_eq!(field, "agents.a.template")
        }
        other => panic!("expected template rejection, got {:?}", other),
    }
}

#[test]
fn unknown_start_order_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[conversation]\nstart_order = \"c\"\n").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    match err.downcast_ref::<ConversationError>() {
        Some(ConversationError::ConfigurationInvalid { field }) => {
            assert_eq!(field, "conversation.start_order")
        }
        other => panic!("expected ConfigurationInvalid, got {:?}", other),
    }
    assert!(format!("{err:#}").contains("unknown variant"));
}

#[tokio::test]
async fn run_writes_jsonl_and_markdown_transcripts() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("transcripts");
    let mut config = Config::default();
    config.conversation.rounds = 2;
    config.conversation.subject = Some("bridges".to_string());

    let jsonl = JsonlTranscript::create_in_dir(&dir, "run").unwrap();
    let jsonl_path = jsonl.path.clone();
    let markdown = MarkdownTranscript::create_in_dir(&dir, "run", ["Ada", "Blaise"], Some("bridges"))
        .unwrap();
    let markdown_path = markdown.path.clone();
    let mut fanout = TranscriptFanout::new();
    fanout.push(Box::new(jsonl));
    fanout.push(Box::new(markdown));

    let settings = EngineSettings {
        rounds: config.conversation.rounds,
        start_order: config.conversation.start_order,
        opening: config.conversation.opening,
        reminder: config.reminder.clone(),
        subject: config.conversation.subject.clone(),
    };
    let mut engine = ConversationEngine::new(
        executor(&config.agents.a, "Ada"),
        executor(&config.agents.b, "Blaise"),
        settings,
        Box::new(fanout),
        Box::new(NullOutput),
    )
    .unwrap();

    let report = engine.run().await.unwrap();
    assert_eq!(report.turns_recorded, 5);

    let content = std::fs::read_to_string(&jsonl_path).unwrap();
    let entries: Vec<LogEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let rows: Vec<(u32, &str, &str)> = entries
        .iter()
        .map(|e| (e.round, e.agent.as_str(), e.text.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (1, "Ada", "Ada says 1"),
            (1, "Blaise", "Blaise says 1"),
            (1, "Blaise", "Blaise says 2"),
            (2, "Ada", "Ada says 2"),
            (2, "Blaise", "Blaise says 3"),
        ]
    );

    let md = std::fs::read_to_string(&markdown_path).unwrap();
    assert!(md.starts_with("# Ada & Blaise"));
    assert!(md.contains("_Subject: bridges_"));
    assert_eq!(md.matches("## Round ").count(), 5);
    assert!(md.contains("## Round 2 · Ada\n\nAda says 2"));
}
