// ABOUTME: Transcript module — durable recording of completed turns.
// ABOUTME: Provides the sink contract plus JSONL, Markdown, and fan-out sinks and the run summary.

pub mod jsonl;
pub mod markdown;
pub mod summary;

pub use jsonl::JsonlTranscript;
pub use markdown::MarkdownTranscript;
pub use summary::{RunSummary, save_summary_to};

use chrono::Utc;

use crate::conversation::Turn;

/// Receives every completed turn, in conversation order.
///
/// `record` is called synchronously once per turn and the engine waits for it
/// to return before the next turn starts. `close` is called exactly once when
/// the run ends, whatever the outcome.
pub trait TranscriptSink: Send {
    fn record(&mut self, turn: &Turn) -> anyhow::Result<()>;

    fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// File-name stamp shared by every artifact of one run.
pub fn run_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Forwards each turn to several sinks in order.
#[derive(Default)]
pub struct TranscriptFanout {
    sinks: Vec<Box<dyn TranscriptSink>>,
}

impl TranscriptFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn TranscriptSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TranscriptSink for TranscriptFanout {
    /// Every sink sees the turn even if an earlier one fails; the first failure is returned.
    fn record(&mut self, turn: &Turn) -> anyhow::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.record(turn) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::DisplayColor;
    use std::sync::{Arc, Mutex};

    struct Capture {
        turns: Arc<Mutex<Vec<Turn>>>,
        closed: Arc<Mutex<u32>>,
        fail: bool,
    }

    impl TranscriptSink for Capture {
        fn record(&mut self, turn: &Turn) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            self.turns.lock().unwrap().push(turn.clone());
            Ok(())
        }

        fn close(&mut self) -> anyhow::Result<()> {
            *self.closed.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn turn() -> Turn {
        Turn {
            round: 1,
            agent: "Ada".into(),
            text: "hello".into(),
            color: DisplayColor::Cyan,
        }
    }

    #[test]
    fn fanout_reaches_every_sink_despite_failure() {
        let turns = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(0));
        let mut fanout = TranscriptFanout::new();
        fanout.push(Box::new(Capture {
            turns: turns.clone(),
            closed: closed.clone(),
            fail: true,
        }));
        fanout.push(Box::new(Capture {
            turns: turns.clone(),
            closed: closed.clone(),
            fail: false,
        }));
        assert_eq!(fanout.len(), 2);

        let err = fanout.record(&turn()).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(turns.lock().unwrap().len(), 1);

        fanout.close().unwrap();
        assert_eq!(*closed.lock().unwrap(), 2);
    }

    #[test]
    fn empty_fanout_accepts_turns() {
        let mut fanout = TranscriptFanout::new();
        assert!(fanout.is_empty());
        assert!(fanout.record(&turn()).is_ok());
    }

    #[test]
    fn run_stamp_is_filename_safe() {
        let stamp = run_stamp();
        assert!(!stamp.contains(':'));
        assert_eq!(stamp.len(), "2026-01-15T10-00-00".len());
    }
}
