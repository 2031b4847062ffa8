//! The Doki brain: one decision pipeline per incoming message.
//!
//! 1. **Gate** the raw text (blocked and warned messages end here)
//! 2. **Classify** it into a subject and topic
//! 3. **Recall** the user's most similar earlier questions
//! 4. **Contextualize** with the user's mastery of the subject
//! 5. **Assemble** the system prompt and conversation turns
//! 6. **Generate** through the configured backend, bounded by a timeout
//! 7. **Post-process**: bump mastery and remember the exchange
//!
//! Dependency failures never abort a message; each component degrades to a
//! documented default instead.

pub mod brain;
pub mod generator;
pub mod mastery;
pub mod overview;
pub mod prompt;
pub mod recall;

pub use brain::{BlockedMessage, Brain, BrainError, BrainReply, Incoming, PreparedMessage};
pub use generator::{HealthReport, ResponseGenerator};
pub use mastery::{MasteryLevel, MasteryPolicy, MasteryTracker, ProfileEntry};
pub use overview::{LeaderboardEntry, StudyOverview};
pub use prompt::PromptSettings;
pub use recall::{ContextRecall, KnowledgeSummary, RecallPolicy, RecallResult};

/// The first `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("equação", 5), "equaç");
        assert_eq!(truncate_chars("curto", 50), "curto");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
