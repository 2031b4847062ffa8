//! Read-only views over a user's study history.

use crate::mastery::{MasteryLevel, ProfileEntry};
use crate::recall::KnowledgeSummary;
use serde::{Deserialize, Serialize};

/// Everything known about one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOverview {
    pub user_id: String,
    pub profile: Vec<ProfileEntry>,
    pub total_interactions: u64,
    pub top_subject: Option<String>,
    pub knowledge_summary: KnowledgeSummary,
}

impl StudyOverview {
    pub fn new(user_id: &str, profile: Vec<ProfileEntry>, knowledge_summary: KnowledgeSummary) -> Self {
        let total_interactions = profile.iter().map(|e| u64::from(e.interaction_count)).sum();
        let top_subject = profile.first().map(|e| e.subject.clone());
        Self {
            user_id: user_id.to_string(),
            profile,
            total_interactions,
            top_subject,
            knowledge_summary,
        }
    }

    /// The profile as a ranked table, position 1 first.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.profile
            .iter()
            .enumerate()
            .map(|(i, e)| LeaderboardEntry {
                position: i + 1,
                subject: e.subject.clone(),
                display_name: e.display_name.clone(),
                icon: e.icon.clone(),
                score: e.score,
                level: e.level,
                interactions: e.interaction_count,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub subject: String,
    pub display_name: String,
    pub icon: String,
    pub score: f64,
    pub level: MasteryLevel,
    pub interactions: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(subject: &str, score: f64, count: u32) -> ProfileEntry {
        ProfileEntry {
            subject: subject.into(),
            display_name: subject.to_uppercase(),
            icon: "📚".into(),
            score,
            level: MasteryLevel::Beginner,
            interaction_count: count,
            last_studied_at: Utc::now(),
            topic: None,
        }
    }

    #[test]
    fn totals_and_ranking() {
        let overview = StudyOverview::new(
            "u1",
            vec![entry("fisica", 10.0, 4), entry("quimica", 5.0, 2)],
            KnowledgeSummary::default(),
        );
        assert_eq!(overview.total_interactions, 6);
        assert_eq!(overview.top_subject.as_deref(), Some("fisica"));

        let board = overview.leaderboard();
        assert_eq!(board[0].position, 1);
        assert_eq!(board[1].subject, "quimica");
        assert_eq!(board[1].interactions, 2);
    }

    #[test]
    fn empty_profile() {
        let overview = StudyOverview::new("u1", Vec::new(), KnowledgeSummary::default());
        assert_eq!(overview.total_interactions, 0);
        assert!(overview.top_subject.is_none());
        assert!(overview.leaderboard().is_empty());
    }
}
