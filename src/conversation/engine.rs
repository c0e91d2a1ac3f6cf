// ABOUTME: Conversation engine — the state machine driving introductions, the opening, and alternation.
// ABOUTME: Sequences the two turn executors strictly one call at a time and owns the rolling state.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{TurnContext, TurnExecutor};
use crate::config::{MAX_ROUNDS, MIN_ROUNDS};
use crate::console::LiveOutput;
use crate::conversation::reminder::ReminderConfig;
use crate::conversation::types::{OpeningPolicy, Seat, StartOrder, Turn};
use crate::error::ConversationError;
use crate::prompt;
use crate::transcript::TranscriptSink;

/// Where the conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Introducing(Seat),
    Opening,
    Alternating { speaker: Seat, round: u32 },
    Terminal,
}

impl Phase {
    /// The phase that follows this one in a conversation of `rounds` rounds.
    pub fn next(self, rounds: u32) -> Phase {
        match self {
            Phase::Idle => Phase::Introducing(Seat::First),
            Phase::Introducing(Seat::First) => Phase::Introducing(Seat::Second),
            Phase::Introducing(Seat::Second) => Phase::Opening,
            Phase::Opening if rounds >= 2 => Phase::Alternating {
                speaker: Seat::First,
                round: 2,
            },
            Phase::Opening => Phase::Terminal,
            Phase::Alternating {
                speaker: Seat::First,
                round,
            } => Phase::Alternating {
                speaker: Seat::Second,
                round,
            },
            Phase::Alternating {
                speaker: Seat::Second,
                round,
            } if round < rounds => Phase::Alternating {
                speaker: Seat::First,
                round: round + 1,
            },
            Phase::Alternating { .. } | Phase::Terminal => Phase::Terminal,
        }
    }

    /// The seat that speaks in this phase and the round its turn belongs to.
    pub fn turn(self) -> Option<(Seat, u32)> {
        match self {
            Phase::Introducing(seat) => Some((seat, 1)),
            Phase::Opening => Some((Seat::Second, 1)),
            Phase::Alternating { speaker, round } => Some((speaker, round)),
            Phase::Idle | Phase::Terminal => None,
        }
    }
}

/// Rolling state of one run.
#[derive(Debug, Default)]
pub struct ConversationState {
    pub round: u32,
    last: [Option<String>; 2],
    pub turns_recorded: usize,
}

impl ConversationState {
    fn remember(&mut self, seat: Seat, turn: Turn) {
        self.round = turn.round;
        self.last[seat.index()] = Some(turn.text);
        self.turns_recorded += 1;
    }

    /// The most recent response from `seat`.
    pub fn last(&self, seat: Seat) -> &str {
        self.last[seat.index()].as_deref().unwrap_or("")
    }
}

/// Schedule knobs for a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub rounds: u32,
    pub start_order: StartOrder,
    pub opening: OpeningPolicy,
    pub reminder: ReminderConfig,
    pub subject: Option<String>,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub turns_recorded: usize,
    pub rounds_completed: u32,
}

/// Drives one conversation between two agents.
pub struct ConversationEngine {
    seats: [TurnExecutor; 2],
    settings: EngineSettings,
    transcript: Box<dyn TranscriptSink>,
    live: Box<dyn LiveOutput>,
    cancel: CancellationToken,
    state: ConversationState,
}

impl ConversationEngine {
    /// Seat agents `a` and `b` according to the start order.
    pub fn new(
        a: TurnExecutor,
        b: TurnExecutor,
        settings: EngineSettings,
        transcript: Box<dyn TranscriptSink>,
        live: Box<dyn LiveOutput>,
    ) -> Result<Self, ConversationError> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&settings.rounds) {
            return Err(ConversationError::config("conversation.rounds"));
        }
        if a.agent().name == b.agent().name {
            return Err(ConversationError::config("agents.b.name"));
        }
        let seats = match settings.start_order {
            StartOrder::A => [a, b],
            StartOrder::B => [b, a],
        };
        Ok(Self {
            seats,
            settings,
            transcript,
            live,
            cancel: CancellationToken::new(),
            state: ConversationState::default(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Turns recorded so far, including by a run that ended in error.
    pub fn turns_recorded(&self) -> usize {
        self.state.turns_recorded
    }

    /// Run the conversation to `Terminal`. The transcript sink is closed
    /// exactly once on every exit path.
    pub async fn run(&mut self) -> Result<RunReport, ConversationError> {
        info!(
            first = %self.seats[0].agent().name,
            second = %self.seats[1].agent().name,
            rounds = self.settings.rounds,
            "conversation starting"
        );
        let outcome = self.drive().await;
        if let Err(e) = self.transcript.close() {
            warn!(error = %e, "failed to close transcript");
        }
        match &outcome {
            Ok(report) => info!(
                turns = report.turns_recorded,
                rounds = report.rounds_completed,
                "conversation finished"
            ),
            Err(e) => warn!(turns = self.state.turns_recorded, error = %e, "conversation aborted"),
        }
        outcome
    }

    async fn drive(&mut self) -> Result<RunReport, ConversationError> {
        let mut phase = Phase::Idle;
        while phase != Phase::Terminal {
            if self.cancel.is_cancelled() {
                return Err(ConversationError::CancellationRequested);
            }
            if let Some((seat, round)) = phase.turn() {
                let prompt = self.prompt_for(phase, seat, round);
                let turn = self.send(seat, &prompt, round).await?;
                self.state.remember(seat, turn);
            }
            phase = phase.next(self.settings.rounds);
        }
        Ok(RunReport {
            turns_recorded: self.state.turns_recorded,
            rounds_completed: self.state.round,
        })
    }

    /// Build the outgoing prompt for the seat speaking in `phase`.
    fn prompt_for(&self, phase: Phase, seat: Seat, round: u32) -> String {
        match phase {
            Phase::Introducing(_) => {
                let speaker = self.seats[seat.index()].agent();
                let partner = self.seats[seat.other().index()].agent();
                prompt::format_introduction(
                    &speaker.template,
                    &speaker.name,
                    &partner.name,
                    self.settings.subject.as_deref(),
                )
            }
            Phase::Opening => {
                let source = match self.settings.opening {
                    OpeningPolicy::PartnerIntro => Seat::First,
                    OpeningPolicy::OwnIntro => Seat::Second,
                };
                self.state.last(source).to_string()
            }
            Phase::Alternating { .. } => self
                .settings
                .reminder
                .apply(self.state.last(seat.other()), round),
            Phase::Idle | Phase::Terminal => String::new(),
        }
    }

    async fn send(&mut self, seat: Seat, prompt: &str, round: u32) -> Result<Turn, ConversationError> {
        let mut ctx = TurnContext {
            transcript: self.transcript.as_mut(),
            live: self.live.as_mut(),
            cancel: &self.cancel,
        };
        self.seats[seat.index()].send(prompt, round, &mut ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(rounds: u32) -> Vec<(Seat, u32)> {
        let mut phase = Phase::Idle;
        let mut turns = Vec::new();
        while phase != Phase::Terminal {
            turns.extend(phase.turn());
            phase = phase.next(rounds);
        }
        turns
    }

    #[test]
    fn single_round_is_introductions_plus_opening() {
        assert_eq!(
            schedule(1),
            vec![(Seat::First, 1), (Seat::Second, 1), (Seat::Second, 1)]
        );
    }

    #[test]
    fn two_rounds_add_one_alternating_pair() {
        assert_eq!(
            schedule(2),
            vec![
                (Seat::First, 1),
                (Seat::Second, 1),
                (Seat::Second, 1),
                (Seat::First, 2),
                (Seat::Second, 2),
            ]
        );
    }

    #[test]
    fn turn_count_is_two_n_plus_one() {
        for rounds in [1, 2, 3, 10, 500] {
            assert_eq!(schedule(rounds).len(), 2 * rounds as usize + 1);
        }
    }

    #[test]
    fn rounds_never_decrease_and_first_seat_leads_each_round() {
        let turns = schedule(6);
        for pair in turns.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
        for round in 2..=6 {
            let in_round: Vec<Seat> = turns
                .iter()
                .filter(|(_, r)| *r == round)
                .map(|(s, _)| *s)
                .collect();
            assert_eq!(in_round, vec![Seat::First, Seat::Second]);
        }
    }

    #[test]
    fn terminal_is_absorbing() {
        assert_eq!(Phase::Terminal.next(5), Phase::Terminal);
        assert_eq!(Phase::Terminal.turn(), None);
        assert_eq!(Phase::Idle.turn(), None);
    }

    #[test]
    fn state_tracks_last_response_per_seat() {
        let mut state = ConversationState::default();
        assert_eq!(state.last(Seat::First), "");
        state.remember(
            Seat::Second,
            Turn {
                round: 3,
                agent: "B".into(),
                text: "latest".into(),
                color: Default::default(),
            },
        );
        assert_eq!(state.last(Seat::Second), "latest");
        assert_eq!(state.round, 3);
        assert_eq!(state.turns_recorded, 1);
    }
}
