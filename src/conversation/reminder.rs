// ABOUTME: Reminder policy — periodically appends a steering instruction to outgoing prompts.
// ABOUTME: Pure functions of the outgoing round and the configured interval.

use serde::Deserialize;

/// Marker placed before the reminder text.
pub const REMINDER_MARKER: &str = "Reminder:";

/// Steering prompt configuration. An interval of 0 disables reminders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub text: Option<String>,
    pub interval: u32,
}

impl ReminderConfig {
    /// Apply this reminder to a prompt bound for the given round.
    pub fn apply(&self, prompt: &str, round: u32) -> String {
        apply(prompt, self.text.as_deref().unwrap_or(""), round, self.interval)
    }
}

/// True iff a reminder is due for the outgoing round.
pub fn should_inject(round: u32, interval: u32) -> bool {
    interval > 0 && round % interval == 0
}

/// Return `prompt` with the reminder appended after a blank line, or `prompt`
/// unchanged when no reminder is due or the reminder text is blank.
pub fn apply(prompt: &str, reminder: &str, round: u32, interval: u32) -> String {
    let reminder = reminder.trim();
    if !should_inject(round, interval) || reminder.is_empty() {
        return prompt.to_string();
    }
    format!("{prompt}\n\n{REMINDER_MARKER} {reminder}")
}
