// ABOUTME: Core conversation types — turns, seats, display colors, and start policies.
// ABOUTME: Shared by the engine, the transcript sinks, and the console output.

use serde::{Deserialize, Serialize};

/// Presentation color attached to an agent. Never affects conversation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    #[default]
    Cyan,
    White,
}

impl DisplayColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
        }
    }
}

/// Which configured agent speaks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOrder {
    /// Agent `a` introduces itself first and opens every round.
    #[default]
    A,
    /// Agent `b` takes the first seat instead.
    B,
}

/// Which introduction reply the second agent answers in the opening turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpeningPolicy {
    /// The second agent answers the first agent's introduction.
    #[default]
    PartnerIntro,
    /// The second agent answers its own introduction reply.
    OwnIntro,
}

/// One of the two positions in the alternation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// One complete agent response within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub round: u32,
    pub agent: String,
    pub text: String,
    pub color: DisplayColor,
}
