// ABOUTME: Introduction prompt templates — positional `{0}`/`{1}` substitution plus `{subject}`.
// ABOUTME: Compiles a default template from src/prompts/, overridable from ~/.duologue/.

use std::fs;
use std::path::{Path, PathBuf};

/// Compiled-in default introduction template.
pub const DEFAULT_INTRODUCTION: &str = include_str!("prompts/introduction.md");

const SELF_SLOT: &str = "{0}";
const PARTNER_SLOT: &str = "{1}";
const SUBJECT_SLOT: &str = "{subject}";

/// Reads a file if it exists, returning None otherwise.
pub fn read_if_exists(path: &Path) -> Option<String> {
    if path.exists() {
        fs::read_to_string(path).ok()
    } else {
        None
    }
}

/// The default template, replaced by `~/.duologue/introduction.md` when present.
pub fn default_introduction() -> String {
    let path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".duologue")
        .join("introduction.md");
    read_if_exists(&path)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_INTRODUCTION.to_string())
}

/// True when the template carries both positional slots.
pub fn has_placeholders(template: &str) -> bool {
    template.contains(SELF_SLOT) && template.contains(PARTNER_SLOT)
}

/// Substitute `{0}` with the speaker's name, `{1}` with the partner's name and
/// `{subject}` with the subject (empty when none).
///
/// Substitution is a single left-to-right pass, so names that themselves look
/// like slots are inserted verbatim.
pub fn format_introduction(
    template: &str,
    self_name: &str,
    partner_name: &str,
    subject: Option<&str>,
) -> String {
    let mut out = String::with_capacity(template.len() + self_name.len() + partner_name.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let (value, consumed) = if tail.starts_with(SELF_SLOT) {
            (self_name, SELF_SLOT.len())
        } else if tail.starts_with(PARTNER_SLOT) {
            (partner_name, PARTNER_SLOT.len())
        } else if tail.starts_with(SUBJECT_SLOT) {
            (subject.unwrap_or(""), SUBJECT_SLOT.len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_has_both_slots() {
        assert!(has_placeholders(DEFAULT_INTRODUCTION));
    }

    #[test]
    fn substitutes_in_fixed_order() {
        let out = format_introduction("Hello {1}, I am {0}.", "Ada", "Blaise", None);
        assert_eq!(out, "Hello Blaise, I am Ada.");
    }

    #[test]
    fn repeated_slots_all_replaced() {
        let out = format_introduction("{0}{0} and {1}{1}", "a", "b", None);
        assert_eq!(out, "aa and bb");
    }

    #[test]
    fn subject_slot_filled_or_blank() {
        let template = "{0} meets {1} to discuss {subject}.";
        assert_eq!(
            format_introduction(template, "A", "B", Some("tides")),
            "A meets B to discuss tides."
        );
        assert_eq!(format_introduction(template, "A", "B", None), "A meets B to discuss .");
    }

    #[test]
    fn names_that_look_like_slots_are_not_reexpanded() {
        let out = format_introduction("{0} / {1}", "{1}", "B", None);
        assert_eq!(out, "{1} / B");
    }

    #[test]
    fn unknown_braces_pass_through() {
        let out = format_introduction("{x} {0} {", "A", "B", None);
        assert_eq!(out, "{x} A {");
    }

    #[test]
    fn missing_slot_detected() {
        assert!(!has_placeholders("Hello {1}"));
        assert!(!has_placeholders("I am {0}"));
        assert!(has_placeholders("{1} {0}"));
    }

    #[test]
    fn read_if_exists_returns_none_for_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_if_exists(&tmp.path().join("nope.md")).is_none());
        let path = tmp.path().join("intro.md");
        std::fs::write(&path, "custom {0} {1}").unwrap();
        assert_eq!(read_if_exists(&path).as_deref(), Some("custom {0} {1}"));
    }
}
