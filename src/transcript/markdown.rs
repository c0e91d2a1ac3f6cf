// ABOUTME: Markdown transcript — a human-readable record of the conversation.
// ABOUTME: One section per turn under a title naming both agents; flushed per turn.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::conversation::Turn;
use crate::transcript::TranscriptSink;

pub struct MarkdownTranscript {
    writer: BufWriter<File>,
    pub path: PathBuf,
}

impl MarkdownTranscript {
    /// Create `<stamp>.md` in `dir` and write the title block.
    pub fn create_in_dir(
        dir: &Path,
        stamp: &str,
        agents: [&str; 2],
        subject: Option<&str>,
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.md", stamp));
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "# {} & {}", agents[0], agents[1])?;
        writeln!(writer)?;
        if let Some(subject) = subject.filter(|s| !s.trim().is_empty()) {
            writeln!(writer, "_Subject: {}_", subject.trim())?;
            writeln!(writer)?;
        }
        writeln!(writer, "_Started {}_", Utc::now().format("%Y-%m-%d %H:%M UTC"))?;
        writer.flush()?;
        Ok(Self { writer, path })
    }
}

impl TranscriptSink for MarkdownTranscript {
    fn record(&mut self, turn: &Turn) -> anyhow::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "## Round {} · {}", turn.round, turn.agent)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", turn.text.trim_end())?;
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
    use crate::conversation::DisplayColor;

    #[test]
    fn title_and_sections_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut md =
            MarkdownTranscript::create_in_dir(tmp.path(), "run", ["Ada", "Blaise"], Some("tides"))
                .unwrap();
        for (round, agent, text) in [(1, "Ada", "Hello."), (1, "Blaise", "Hi!\n\n")] {
            md.record(&Turn {
                round,
                agent: agent.to_string(),
                text: text.to_string(),
                color: DisplayColor::White,
            })
            .unwrap();
        }
        md.close().unwrap();

        let content = fs::read_to_string(tmp.path().join("run.md")).unwrap();
        assert!(content.starts_with("# Ada & Blaise\n"));
        assert!(content.contains("_Subject: tides_"));
        let ada = content.find("## Round 1 · Ada").unwrap();
        let blaise = content.find("## Round 1 · Blaise").unwrap();
        assert!(ada < blaise);
        assert!(content.ends_with("Hi!\n"));
    }

    #[test]
    fn blank_subject_is_omitted() {
        let tmp = tempfile::tempdir().unwrap();
        let md = MarkdownTranscript::create_in_dir(tmp.path(), "s", ["A", "B"], Some(" ")).unwrap();
        let content = fs::read_to_string(&md.path).unwrap();
        assert!(!content.contains("Subject"));
    }
}
