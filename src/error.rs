// ABOUTME: Error classification for a conversation run.
// ABOUTME: Every failure the engine surfaces maps to exactly one of these kinds.

/// Errors surfaced by the conversation engine to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    /// The remote API call failed: auth, non-success status, transport fault,
    /// malformed stream, or a stalled stream hitting the idle timeout.
    #[error("API call failed: {reason}")]
    ApiCallFailed { reason: String },

    /// Configuration was rejected before any turn ran.
    #[error("invalid configuration: {field}")]
    ConfigurationInvalid { field: String },

    /// The run was cancelled between or during turns.
    #[error("conversation cancelled")]
    CancellationRequested,
}

impl ConversationError {
    pub fn api(reason: impl Into<String>) -> Self {
        Self::ApiCallFailed {
            reason: reason.into(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            field: field.into(),
        }
    }
}
