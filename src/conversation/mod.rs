// ABOUTME: Conversation module — the turn-taking engine, reminder policy, and shared turn types.
// ABOUTME: Drives two agents through introductions, the opening, and N alternating rounds.

pub mod engine;
pub mod reminder;
pub mod types;

pub use engine::{ConversationEngine, ConversationState, EngineSettings, Phase, RunReport};
pub use reminder::ReminderConfig;
pub use types::{DisplayColor, OpeningPolicy, Seat, StartOrder, Turn};
