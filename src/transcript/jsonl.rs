// ABOUTME: JSONL transcript — appends each completed turn as one JSON line.
// ABOUTME: Writes <transcript_dir>/<stamp>.jsonl and flushes after every line.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::conversation::{DisplayColor, Turn};
use crate::transcript::TranscriptSink;

/// A single JSONL log entry: a timestamp plus the turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub round: u32,
    pub agent: String,
    pub color: DisplayColor,
    pub text: String,
}

/// Appends turns as JSONL lines to a transcript file.
pub struct JsonlTranscript {
    writer: BufWriter<File>,
    pub path: PathBuf,
}

impl JsonlTranscript {
    /// Create the directory if needed and open `<stamp>.jsonl` inside it.
    pub fn create_in_dir(dir: &Path, stamp: &str) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.jsonl", stamp));
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }
}

impl TranscriptSink for JsonlTranscript {
    fn record(&mut self, turn: &Turn) -> anyhow::Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            round: turn.round,
            agent: turn.agent.clone(),
            color: turn.color,
            text: turn.text.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(round: u32, agent: &str, text: &str) -> Turn {
        Turn {
            round,
            agent: agent.to_string(),
            text: text.to_string(),
            color: DisplayColor::Green,
        }
    }

    #[test]
    fn writes_one_valid_line_per_turn() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("transcripts");

        let mut log = JsonlTranscript::create_in_dir(&dir, "run").unwrap();
        log.record(&turn(1, "Ada", "Hello, world!")).unwrap();
        log.record(&turn(1, "Blaise", "Hi.\nTwo lines.")).unwrap();
        log.close().unwrap();

        let content = fs::read_to_string(dir.join("run.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2, "embedded newlines must stay escaped");

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(parsed.get("timestamp").is_some(), "should have timestamp field");
        assert_eq!(parsed["color"], "green");
    }

    #[test]
    fn entries_read_back_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = JsonlTranscript::create_in_dir(tmp.path(), "order").unwrap();
        for (round, agent) in [(1, "Ada"), (1, "Blaise"), (2, "Ada")] {
            log.record(&turn(round, agent, "x")).unwrap();
        }

        let content = fs::read_to_string(&log.path).unwrap();
        let entries: Vec<LogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let order: Vec<(u32, &str)> = entries.iter().map(|e| (e.round, e.agent.as_str())).collect();
        assert_eq!(order, vec![(1, "Ada"), (1, "Blaise"), (2, "Ada")]);
        assert_eq!(entries[2].text, "x");
    }
}
