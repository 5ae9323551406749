//! Localized-text lookup.
//!
//! The orchestrator fetches every on-screen string through the [`Localizer`]
//! trait before a phase's content is finalized. Lookups are asynchronous but
//! must never fail: a missing key degrades to the key wrapped in a visible
//! marker, so the session stays on schedule no matter how broken the string
//! tables are.

pub mod catalog;

pub use catalog::{CatalogLocalizer, StringCatalog};

/// Table holding strings shared across task types (fixation glyph, break
/// text, completion message).
pub const UI_TABLE: &str = "ui";

/// Table holding the attention-test option labels and prompt.
pub const ATTENTION_TABLE: &str = "attention";

/// Well-known keys the orchestrator looks up.
pub mod keys {
    /// Label for the first response option.
    pub const OPTION_A: &str = "option_a";
    /// Label for the second response option.
    pub const OPTION_B: &str = "option_b";
    /// Question shown above the stimulus.
    pub const PROMPT: &str = "prompt";
    /// Neutral glyph shown during fixation.
    pub const FIXATION: &str = "fixation";
    /// Message shown during an inter-run break.
    pub const BREAK_MESSAGE: &str = "break_message";
    /// Message shown when the session finishes.
    pub const SESSION_COMPLETE: &str = "session_complete";
}

/// Source of localized strings, keyed by `(table, key)`.
///
/// Implementations must tolerate missing entries by returning the key
/// wrapped in `[[...]]` rather than erroring; callers rely on that to stay
/// responsive when tables are incomplete.
#[async_trait::async_trait]
pub trait Localizer: Send + Sync {
    /// Resolves one string. Never fails; missing keys come back as
    /// [`fallback_marker`] output.
    async fn get_string(&self, table: &str, key: &str) -> String;
}

/// The degraded-mode stand-in for a missing key.
#[must_use]
pub fn fallback_marker(key: &str) -> String {
    format!("[[{key}]]")
}

/// Catalog table name for a task-type label (its lowercase form).
#[must_use]
pub fn task_table(task_type: &str) -> String {
    task_type.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_wraps_key_verbatim() {
        assert_eq!(fallback_marker("option_a"), "[[option_a]]");
        assert_eq!(fallback_marker(""), "[[]]");
    }

    #[test]
    fn task_table_lowercases_label() {
        assert_eq!(task_table("Social"), "social");
        assert_eq!(task_table("GAIN-Loss"), "gain-loss");
    }
}
