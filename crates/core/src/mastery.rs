//! Mastery records: how much a user has studied each subject.
//!
//! A record is identified by `(user_id, subject)`. Its score is a monotonic,
//! saturating counter: every interaction adds a fixed increment and the
//! result is clamped at the configured ceiling. Scores never decrease.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent per-(user, subject) mastery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub user_id: String,
    pub subject: String,
    /// Clamped to `[0, max_score]`
    pub score: f64,
    pub interaction_count: u32,
    pub last_studied_at: DateTime<Utc>,
    /// Last topic seen in this subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// One interaction's worth of change to a mastery record.
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub increment: f64,
    pub max_score: f64,
    pub topic: Option<String>,
    pub at: DateTime<Utc>,
}

impl ScoreUpdate {
    /// The topic to store, ignoring empty strings.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().filter(|t| !t.is_empty())
    }
}

impl MasteryRecord {
    /// The record created by a user's first interaction in a subject.
    pub fn first(user_id: &str, subject: &str, update: &ScoreUpdate) -> Self {
        Self {
            user_id: user_id.to_string(),
            subject: subject.to_string(),
            score: update.increment.min(update.max_score),
            interaction_count: 1,
            last_studied_at: update.at,
            topic: update.topic().map(String::from),
        }
    }

    /// Apply one more interaction in place.
    pub fn apply(&mut self, update: &ScoreUpdate) {
        self.score = (self.score + update.increment).min(update.max_score);
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.last_studied_at = update.at;
        if let Some(topic) = update.topic() {
            self.topic = Some(topic.to_string());
        }
    }
}

/// Persistence for mastery records.
///
/// Implementations: in-memory (tests, ephemeral sessions) and SQLite.
#[async_trait]
pub trait MasteryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Get-or-create the record and apply `update` as one atomic step.
    ///
    /// Concurrent calls for the same key must never lose an increment.
    async fn record(
        &self,
        user_id: &str,
        subject: &str,
        update: ScoreUpdate,
    ) -> Result<MasteryRecord, MemoryError>;

    /// Fetch a single record.
    async fn get(&self, user_id: &str, subject: &str) -> Result<Option<MasteryRecord>, MemoryError>;

    /// All records for a user, highest score first.
    async fn list(&self, user_id: &str) -> Result<Vec<MasteryRecord>, MemoryError>;

    /// Remove every record owned by a user. Returns how many were removed.
    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(topic: Option<&str>) -> ScoreUpdate {
        ScoreUpdate {
            increment: 2.5,
            max_score: 100.0,
            topic: topic.map(String::from),
            at: Utc::now(),
        }
    }

    #[test]
    fn first_interaction_scores_one_increment() {
        let record = MasteryRecord::first("u1", "fisica", &update(Some("optica")));
        assert_eq!(record.score, 2.5);
        assert_eq!(record.interaction_count, 1);
        assert_eq!(record.topic.as_deref(), Some("optica"));
    }

    #[test]
    fn apply_clamps_at_ceiling() {
        let mut record = MasteryRecord::first("u1", "fisica", &update(None));
        record.score = 99.0;
        record.apply(&update(None));
        assert_eq!(record.score, 100.0);
        assert_eq!(record.interaction_count, 2);
    }

    #[test]
    fn empty_topic_keeps_previous() {
        let mut record = MasteryRecord::first("u1", "fisica", &update(Some("mecanica")));
        record.apply(&update(Some("")));
        assert_eq!(record.topic.as_deref(), Some("mecanica"));
        record.apply(&update(Some("optica")));
        assert_eq!(record.topic.as_deref(), Some("optica"));
    }
}
