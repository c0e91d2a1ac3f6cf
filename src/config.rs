// ABOUTME: Configuration loading for duologue.
// ABOUTME: Reads ~/.duologue/config.toml, applies CLI overrides, and validates bounds.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::conversation::{DisplayColor, OpeningPolicy, ReminderConfig, StartOrder};
use crate::error::ConversationError;
use crate::prompt;

/// Inclusive bounds on the number of rounds.
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 500;

/// Provider names accepted by the client factory.
pub const PROVIDERS: &[&str] = &["anthropic", "openai", "openrouter", "ollama"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
    pub reminder: ReminderConfig,
    pub agents: AgentsConfig,
    pub transcript: TranscriptConfig,
}

/// LLM provider configuration shared by both agents.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    /// Idle timeout while waiting for each fragment; 0 disables it.
    pub timeout_seconds: u64,
    pub base_url: Option<String>,
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            timeout_seconds: 120,
            base_url: None,
            ollama: OllamaConfig::default(),
        }
    }
}

/// Ollama-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Schedule of the conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub rounds: u32,
    pub start_order: StartOrder,
    pub opening: OpeningPolicy,
    /// Substituted for `{subject}` in introduction templates.
    pub subject: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            start_order: StartOrder::default(),
            opening: OpeningPolicy::default(),
            subject: None,
        }
    }
}

/// The two participants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub a: AgentConfig,
    pub b: AgentConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            a: AgentConfig::named("Ada", DisplayColor::Cyan),
            b: AgentConfig::named("Blaise", DisplayColor::Magenta),
        }
    }
}

/// One participant's identity and prompt template.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub color: DisplayColor,
    /// Introduction template: `{0}` is this agent, `{1}` the partner.
    pub template: String,
    /// Overrides `llm.model` for this agent.
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

impl AgentConfig {
    fn named(name: &str, color: DisplayColor) -> Self {
        Self {
            name: name.to_string(),
            color,
            template: prompt::default_introduction(),
            model: None,
            system_prompt: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::named("", DisplayColor::default())
    }
}

/// Where and how transcripts are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub dir: Option<PathBuf>,
    pub markdown: bool,
    pub jsonl: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            dir: None,
            markdown: true,
            jsonl: true,
        }
    }
}

impl TranscriptConfig {
    /// The configured directory, or the per-user data directory.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(Config::transcripts_dir)
    }
}

impl Config {
    /// Load config from ~/.duologue/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| classify_toml_error(&content, e))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, rounds: Option<u32>, transcript_dir: Option<PathBuf>) {
        if let Some(rounds) = rounds {
            self.conversation.rounds = rounds;
        }
        if let Some(dir) = transcript_dir {
            self.transcript.dir = Some(dir);
        }
    }

    /// Reject configurations the engine must never start with.
    pub fn validate(&self) -> Result<(), ConversationError> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.conversation.rounds) {
            return Err(ConversationError::config("conversation.rounds"));
        }
        if !PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConversationError::config("llm.provider"));
        }
        for (key, agent) in [("a", &self.agents.a), ("b", &self.agents.b)] {
            if agent.name.trim().is_empty() {
                return Err(ConversationError::config(format!("agents.{key}.name")));
            }
            if !prompt::has_placeholders(&agent.template) {
                return Err(ConversationError::config(format!("agents.{key}.template")));
            }
        }
        if self.agents.a.name.trim() == self.agents.b.name.trim() {
            return Err(ConversationError::config("agents.b.name"));
        }
        Ok(())
    }

    fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".duologue")
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Path to the optional dotenv file holding API keys.
    pub fn secrets_env_path() -> PathBuf {
        Self::base_dir().join("secrets.env")
    }

    /// Default transcript directory under the platform data dir.
    pub fn transcripts_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(Self::base_dir)
            .join("duologue")
            .join("transcripts")
    }
}

/// Dotted key path of the `key = value` line containing byte `offset`,
/// qualified by the nearest table header above it.
fn key_path_at(content: &str, offset: usize) -> Option<String> {
    let before = content.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line = content[line_start..].lines().next().unwrap_or("");
    let (key, _) = line.split_once('=')?;
    let key = key.trim().trim_matches('"');
    if key.is_empty() || key.starts_with('[') || key.starts_with('#') {
        return None;
    }
    let table = content[..line_start]
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('['))
        .and_then(|l| l.trim_start_matches('[').split(']').next())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    Some(match table {
        Some(table) => format!("{table}.{key}"),
        None => key.to_string(),
    })
}

/// A value the config types reject (an unknown enum variant, a wrong type)
/// becomes `ConfigurationInvalid` naming the key; the parser message is kept
/// as context. Errors that cannot be tied to a key pass through unchanged.
fn classify_toml_error(content: &str, err: toml::de::Error) -> anyhow::Error {
    match err.span().and_then(|span| key_path_at(content, span.start)) {
        Some(field) => anyhow::Error::new(ConversationError::config(field))
            .context(err.message().trim().to_string()),
        None => err.into(),
    }
}
