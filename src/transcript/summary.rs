// ABOUTME: Run summary — a small JSON record of how a finished conversation run went.
// ABOUTME: Written atomically (tmp + rename) next to the transcripts after the run ends.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Outcome of one completed, failed, or cancelled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub agents: Vec<String>,
    /// Model each agent talked to, in the same order as `agents`.
    pub models: Vec<String>,
    pub rounds_requested: u32,
    pub turns_recorded: usize,
    pub created_at: String,
    pub finished_at: String,
    /// `"completed"`, or the error that ended the run.
    pub outcome: String,
}

impl RunSummary {
    /// Start a summary for a run that is about to begin.
    pub fn begin(agents: [&str; 2], models: [&str; 2], rounds_requested: u32) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            agents: agents.iter().map(|a| a.to_string()).collect(),
            models: models.iter().map(|m| m.to_string()).collect(),
            rounds_requested,
            turns_recorded: 0,
            created_at: now.clone(),
            finished_at: now,
            outcome: String::new(),
        }
    }

    /// Stamp the finish time, turn count, and outcome.
    pub fn finish(&mut self, turns_recorded: usize, outcome: impl Into<String>) {
        self.turns_recorded = turns_recorded;
        self.finished_at = Utc::now().to_rfc3339();
        self.outcome = outcome.into();
    }
}

/// Path of the summary file for a run stamp.
pub fn summary_path(dir: &Path, stamp: &str) -> PathBuf {
    dir.join(format!("{}.summary.json", stamp))
}

/// Save a summary (atomic write via tmp + rename).
pub fn save_summary_to(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(summary)?;
    std::fs::write(&tmp_path, &content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
