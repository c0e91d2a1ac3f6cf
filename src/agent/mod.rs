// ABOUTME: Agent module — API bindings, stream aggregation, and the per-agent turn executor.
// ABOUTME: Everything between "send this prompt" and "here is the complete turn".

pub mod anthropic;
pub mod executor;
pub mod openai;
pub mod provider;
pub mod session;
pub mod stream;

pub use executor::{Agent, TurnContext, TurnExecutor};
pub use provider::*;
pub use session::ChatSession;
pub use stream::aggregate;
